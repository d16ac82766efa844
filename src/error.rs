use thiserror::Error;

/// Errors raised for call-level misuse of the network and analysis APIs.
///
/// Solver failures inside a connected component are not errors: they are
/// reported through [`ComponentStatus`](crate::ComponentStatus).
#[derive(Debug, Error)]
pub enum Error {
    #[error("{kind} '{id}' not found")]
    ElementNotFound { kind: &'static str, id: String },

    #[error("Element '{0}' already exists")]
    DuplicateId(String),

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("invalid contingency: {0}")]
    InvalidContingency(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("import failed: {0}")]
    Import(String),
}

impl Error {
    pub(crate) fn not_found(kind: &'static str, id: &str) -> Self {
        Error::ElementNotFound {
            kind,
            id: id.to_string(),
        }
    }
}

impl From<derive_builder::UninitializedFieldError> for Error {
    fn from(err: derive_builder::UninitializedFieldError) -> Self {
        Error::InvalidConfiguration(format!("missing field `{}`", err.field_name()))
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
