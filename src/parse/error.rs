use thiserror::Error;

/// Errors produced when parsing text rules.
#[derive(Debug, Error)]
#[error("parse error at offset {offset}: {message}")]
pub struct ParseError {
    message: String,
    offset: usize,
}

impl ParseError {
    pub(crate) fn new(message: impl Into<String>, offset: usize) -> Self {
        Self {
            message: message.into(),
            offset,
        }
    }

    /// Byte offset into the input where parsing failed.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }
}
