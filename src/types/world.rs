use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::GraphError;
use super::rule::Rule;

/// A directed, rule-gated edge between two regions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exit {
    pub name: String,
    pub target: String,
    /// `None` means the exit is unconditional.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule: Option<Rule>,
}

/// A checkable point of interest inside a region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub name: String,
    /// Parent region. Always set to the enclosing region during compilation;
    /// any value in a document is replaced.
    #[serde(default)]
    pub region: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule: Option<Rule>,
}

/// A named area of the world graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub name: String,
    #[serde(default)]
    pub exits: Vec<Exit>,
    #[serde(default)]
    pub locations: Vec<Location>,
    /// Region-level rules. All must hold for the region to be entered.
    #[serde(default)]
    pub rules: Vec<Rule>,
    /// World-type flags (e.g. `"dark_world"`), carried as metadata.
    #[serde(default)]
    pub flags: BTreeSet<String>,
}

/// The serialized form of a world graph, as found in rule documents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldDocument {
    pub start_regions: Vec<String>,
    pub item_groups: BTreeMap<String, Vec<String>>,
    pub regions: Vec<Region>,
}

/// A compiled, immutable world graph. Thread-safe and designed to live behind `Arc`.
///
/// Produced by [`WorldBuilder::compile()`] or [`WorldGraph::from_json()`];
/// rules are replaced wholesale by building a new graph.
#[derive(Debug, Clone)]
pub struct WorldGraph {
    pub(crate) regions: Vec<Region>,
    pub(crate) region_indices: HashMap<String, usize>,
    pub(crate) start: Vec<usize>,
    pub(crate) item_groups: BTreeMap<String, Vec<String>>,
    /// Per region: `(source region index, exit index)` of every exit targeting it.
    pub(crate) incoming: Vec<Vec<(usize, usize)>>,
    /// `(region index, exit index)` of exits whose target does not exist.
    pub(crate) dangling: Vec<(usize, usize)>,
    pub(crate) location_regions: HashMap<String, usize>,
}

impl WorldGraph {
    /// Parse a JSON world document and compile it.
    ///
    /// # Errors
    ///
    /// Returns [`LogicError`](crate::LogicError) on JSON or validation failure.
    pub fn from_json(input: &str) -> Result<Self, crate::LogicError> {
        let document: WorldDocument = serde_json::from_str(input)?;
        Ok(Self::from_document(document)?)
    }

    /// Read a JSON world document from disk and compile it.
    ///
    /// # Errors
    ///
    /// Returns [`LogicError`](crate::LogicError) on I/O, JSON or validation failure.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, crate::LogicError> {
        let input = std::fs::read_to_string(path)?;
        Self::from_json(&input)
    }

    /// Compile an already-deserialized document.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError`] if validation fails.
    pub fn from_document(document: WorldDocument) -> Result<Self, GraphError> {
        crate::compile::compile(document)
    }

    /// Convert back into the serializable document form.
    #[must_use]
    pub fn to_document(&self) -> WorldDocument {
        WorldDocument {
            start_regions: self.start_regions().map(str::to_owned).collect(),
            item_groups: self.item_groups.clone(),
            regions: self.regions.clone(),
        }
    }

    #[must_use]
    pub fn region(&self, name: &str) -> Option<&Region> {
        self.region_indices.get(name).map(|&idx| &self.regions[idx])
    }

    #[must_use]
    pub fn contains_region(&self, name: &str) -> bool {
        self.region_indices.contains_key(name)
    }

    /// Regions in declaration order.
    pub fn regions(&self) -> impl Iterator<Item = &Region> {
        self.regions.iter()
    }

    #[must_use]
    pub fn region_count(&self) -> usize {
        self.regions.len()
    }

    pub fn start_regions(&self) -> impl Iterator<Item = &str> {
        self.start.iter().map(|&idx| self.regions[idx].name.as_str())
    }

    #[must_use]
    pub fn is_start_region(&self, name: &str) -> bool {
        self.region_indices
            .get(name)
            .is_some_and(|idx| self.start.contains(idx))
    }

    /// Items belonging to a named group, if the world defines it.
    #[must_use]
    pub fn item_group(&self, group: &str) -> Option<&[String]> {
        self.item_groups.get(group).map(Vec::as_slice)
    }

    /// Every exit leading from `from` directly to `to`, in declaration order.
    #[must_use]
    pub fn exits_between(&self, from: &str, to: &str) -> Vec<&Exit> {
        self.region(from)
            .map(|region| region.exits.iter().filter(|e| e.target == to).collect())
            .unwrap_or_default()
    }

    /// Every exit targeting `region`, paired with its source region name.
    #[must_use]
    pub fn incoming_exits(&self, region: &str) -> Vec<(&str, &Exit)> {
        self.region_indices
            .get(region)
            .map(|&idx| {
                self.incoming[idx]
                    .iter()
                    .map(|&(src, exit)| {
                        let source = &self.regions[src];
                        (source.name.as_str(), &source.exits[exit])
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Exits whose target region does not exist, paired with their source region.
    #[must_use]
    pub fn dangling_exits(&self) -> Vec<(&str, &Exit)> {
        self.dangling
            .iter()
            .map(|&(src, exit)| {
                let source = &self.regions[src];
                (source.name.as_str(), &source.exits[exit])
            })
            .collect()
    }

    /// Look up a location and its parent region by location name.
    #[must_use]
    pub fn location(&self, name: &str) -> Option<(&Region, &Location)> {
        let &idx = self.location_regions.get(name)?;
        let region = &self.regions[idx];
        region
            .locations
            .iter()
            .find(|l| l.name == name)
            .map(|location| (region, location))
    }

    #[must_use]
    pub fn location_count(&self) -> usize {
        self.location_regions.len()
    }
}

#[cfg(feature = "binary-cache")]
impl WorldGraph {
    /// Serialize this compiled graph to a byte vector.
    ///
    /// The optional `source_text` (typically the JSON document) is hashed
    /// with BLAKE3 and embedded in the payload metadata so callers can tell
    /// when the cache is stale.
    ///
    /// # Errors
    ///
    /// Returns [`SerializeError`](crate::serial::SerializeError) if encoding fails.
    pub fn to_bytes(
        &self,
        source_text: Option<&str>,
    ) -> Result<Vec<u8>, crate::serial::SerializeError> {
        crate::serial::encode(self, source_text)
    }

    /// Deserialize a graph previously produced by [`to_bytes`](Self::to_bytes).
    /// The graph is revalidated on load.
    ///
    /// # Errors
    ///
    /// Returns [`DeserializeError`](crate::serial::DeserializeError) on
    /// format, integrity, or validation failure.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, crate::serial::DeserializeError> {
        crate::serial::decode(bytes)
    }

    /// Serialize this graph and write it to a file.
    ///
    /// # Errors
    ///
    /// Returns [`SerializeError`](crate::serial::SerializeError) on
    /// encoding or I/O failure.
    pub fn to_binary_file(
        &self,
        path: impl AsRef<std::path::Path>,
        source_text: Option<&str>,
    ) -> Result<(), crate::serial::SerializeError> {
        let bytes = self.to_bytes(source_text)?;
        std::fs::write(path, bytes)?;
        Ok(())
    }

    /// Read a file and deserialize the graph it contains.
    ///
    /// # Errors
    ///
    /// Returns [`DeserializeError`](crate::serial::DeserializeError) on
    /// I/O, format, integrity, or validation failure.
    pub fn from_binary_file(
        path: impl AsRef<std::path::Path>,
    ) -> Result<Self, crate::serial::DeserializeError> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes)
    }
}

impl fmt::Display for WorldGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let exits: usize = self.regions.iter().map(|r| r.exits.len()).sum();
        write!(
            f,
            "WorldGraph({} regions, {} exits, {} locations, {} start)",
            self.regions.len(),
            exits,
            self.location_regions.len(),
            self.start.len(),
        )
    }
}

/// A rule given either as a tree or as text to parse at compile time.
#[derive(Debug, Clone)]
enum RuleSource {
    Tree(Rule),
    Text(String),
}

/// Builder for constructing a [`WorldGraph`].
///
/// # Example
///
/// ```
/// use logicmap::{WorldBuilder, has};
///
/// let world = WorldBuilder::new()
///     .start("Menu")
///     .region("Menu", |r| r.exit("Cave Entrance", "Cave", Some(has("Lantern"))))
///     .region("Cave", |r| r.location_when("Cave Chest", r#"count("Rupee", 50)"#))
///     .compile()
///     .unwrap();
/// assert_eq!(world.region_count(), 2);
/// ```
#[derive(Debug, Default)]
pub struct WorldBuilder {
    start: Vec<String>,
    groups: BTreeMap<String, Vec<String>>,
    regions: Vec<RegionBuilder>,
}

/// Intermediate builder passed to the region definition closure.
#[derive(Debug)]
pub struct RegionBuilder {
    name: String,
    exits: Vec<(String, String, Option<RuleSource>)>,
    locations: Vec<(String, Option<RuleSource>)>,
    rules: Vec<RuleSource>,
    flags: BTreeSet<String>,
}

impl WorldBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a start region. May be called more than once.
    #[must_use]
    pub fn start(mut self, region: &str) -> Self {
        self.start.push(region.to_owned());
        self
    }

    /// Define an item group used by `group_check`.
    #[must_use]
    pub fn group<I, S>(mut self, name: &str, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.groups
            .insert(name.to_owned(), items.into_iter().map(Into::into).collect());
        self
    }

    /// Define a region through a closure that adds its exits and locations.
    #[must_use]
    pub fn region(mut self, name: &str, f: impl FnOnce(RegionBuilder) -> RegionBuilder) -> Self {
        let builder = f(RegionBuilder {
            name: name.to_owned(),
            exits: Vec::new(),
            locations: Vec::new(),
            rules: Vec::new(),
            flags: BTreeSet::new(),
        });
        self.regions.push(builder);
        self
    }

    /// Resolve text rules and compile into an immutable `WorldGraph`.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError`] if a text rule fails to parse or validation fails.
    pub fn compile(self) -> Result<WorldGraph, GraphError> {
        let regions = self
            .regions
            .into_iter()
            .map(RegionBuilder::finish)
            .collect::<Result<Vec<_>, _>>()?;
        crate::compile::compile(WorldDocument {
            start_regions: self.start,
            item_groups: self.groups,
            regions,
        })
    }
}

impl RegionBuilder {
    #[must_use]
    pub fn exit(mut self, name: &str, target: &str, rule: Option<Rule>) -> Self {
        self.exits
            .push((name.to_owned(), target.to_owned(), rule.map(RuleSource::Tree)));
        self
    }

    /// Add an exit whose rule is written in the text syntax.
    #[must_use]
    pub fn exit_when(mut self, name: &str, target: &str, rule: &str) -> Self {
        self.exits.push((
            name.to_owned(),
            target.to_owned(),
            Some(RuleSource::Text(rule.to_owned())),
        ));
        self
    }

    #[must_use]
    pub fn location(mut self, name: &str, rule: Option<Rule>) -> Self {
        self.locations
            .push((name.to_owned(), rule.map(RuleSource::Tree)));
        self
    }

    /// Add a location whose rule is written in the text syntax.
    #[must_use]
    pub fn location_when(mut self, name: &str, rule: &str) -> Self {
        self.locations
            .push((name.to_owned(), Some(RuleSource::Text(rule.to_owned()))));
        self
    }

    /// Add a region-level rule.
    #[must_use]
    pub fn rule(mut self, rule: Rule) -> Self {
        self.rules.push(RuleSource::Tree(rule));
        self
    }

    #[must_use]
    pub fn flag(mut self, flag: &str) -> Self {
        self.flags.insert(flag.to_owned());
        self
    }

    fn finish(self) -> Result<Region, GraphError> {
        let region_name = self.name;
        let exits = self
            .exits
            .into_iter()
            .map(|(name, target, rule)| {
                let owner = format!("{region_name} -> {name}");
                Ok(Exit {
                    rule: resolve(rule, &owner)?,
                    name,
                    target,
                })
            })
            .collect::<Result<Vec<_>, GraphError>>()?;
        let locations = self
            .locations
            .into_iter()
            .map(|(name, rule)| {
                Ok(Location {
                    rule: resolve(rule, &name)?,
                    region: region_name.clone(),
                    name,
                })
            })
            .collect::<Result<Vec<_>, GraphError>>()?;
        let rules = self
            .rules
            .into_iter()
            .map(|rule| resolve(Some(rule), &region_name))
            .collect::<Result<Vec<_>, GraphError>>()?
            .into_iter()
            .flatten()
            .collect();
        Ok(Region {
            name: region_name,
            exits,
            locations,
            rules,
            flags: self.flags,
        })
    }
}

fn resolve(source: Option<RuleSource>, owner: &str) -> Result<Option<Rule>, GraphError> {
    match source {
        None => Ok(None),
        Some(RuleSource::Tree(rule)) => Ok(Some(rule)),
        Some(RuleSource::Text(text)) => crate::parse::parse_rule(&text)
            .map(Some)
            .map_err(|e| GraphError::InvalidRule {
                owner: owner.to_owned(),
                message: e.to_string(),
            }),
    }
}
