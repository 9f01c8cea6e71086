use thiserror::Error;

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("duplicate region name '{name}'")]
    DuplicateRegion { name: String },

    #[error("duplicate location name '{name}' (in region '{region}')")]
    DuplicateLocation { name: String, region: String },

    #[error("duplicate exit name '{name}' in region '{region}'")]
    DuplicateExit { name: String, region: String },

    #[error("region names must not be empty")]
    EmptyRegionName,

    #[error("no start region declared; at least one is required")]
    NoStartRegion,

    #[error("start region '{region}' is not defined")]
    UndefinedStartRegion { region: String },

    #[error("invalid rule on '{owner}': {message}")]
    InvalidRule { owner: String, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_region_message() {
        let err = GraphError::DuplicateRegion {
            name: "Menu".into(),
        };
        assert_eq!(err.to_string(), "duplicate region name 'Menu'");
    }

    #[test]
    fn duplicate_location_message() {
        let err = GraphError::DuplicateLocation {
            name: "Chest".into(),
            region: "Cave".into(),
        };
        assert_eq!(
            err.to_string(),
            "duplicate location name 'Chest' (in region 'Cave')"
        );
    }

    #[test]
    fn no_start_region_message() {
        assert_eq!(
            GraphError::NoStartRegion.to_string(),
            "no start region declared; at least one is required"
        );
    }

    #[test]
    fn undefined_start_region_message() {
        let err = GraphError::UndefinedStartRegion {
            region: "Nowhere".into(),
        };
        assert_eq!(err.to_string(), "start region 'Nowhere' is not defined");
    }

    #[test]
    fn invalid_rule_message() {
        let err = GraphError::InvalidRule {
            owner: "Menu -> Cave".into(),
            message: "parse error: unexpected end".into(),
        };
        assert_eq!(
            err.to_string(),
            "invalid rule on 'Menu -> Cave': parse error: unexpected end"
        );
    }
}
