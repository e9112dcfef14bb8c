use crate::model::{buffer::Field, descriptor::DescriptorId};
use itertools::Itertools;

/// A connection string that could not be decoded. Never fatal: the string
/// field is flagged and the structured fields keep their values.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("segment {index} (`{segment}`) has no `=`")]
    MissingEquals { index: usize, segment: String },

    #[error("segment {index} has an empty key")]
    EmptyKey { index: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: Field,
    pub reason: &'static str,
}

/// Every field that blocks a save, in form order.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    pub errors: Vec<FieldError>,
}

impl ValidationReport {
    /// The field the user should be sent to first.
    #[must_use]
    pub fn first_focus(&self) -> Option<Field> {
        self.errors.first().map(|error| error.field)
    }
}

impl std::fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let fields = self
            .errors
            .iter()
            .map(|error| format!("{}: {}", error.field, error.reason))
            .join("; ");
        write!(f, "{fields}")
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CipherError {
    #[error("encryption failed: {0}")]
    Encrypt(String),

    #[error("decryption failed: {0}")]
    Decrypt(String),
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error(transparent)]
    Cipher(#[from] CipherError),

    #[error("a save is already waiting on the cipher service")]
    SaveInProgress,

    #[error("no stored connection with id {0}")]
    NotFound(DescriptorId),

    #[error("could not write connections: {0}")]
    Storage(String),
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Storage(format!("{err:#}"))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
