/// Error type for type declaration and resolution.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TypeError {
    /// A field or parameter does not reduce to Scalar/List/Map/Record.
    #[error("Unsupported type at '{path}': {reason}")]
    Unsupported { path: String, reason: String },

    #[error("Invalid identifier '{name}': {reason}")]
    InvalidIdentifier { name: String, reason: String },

    #[error("Field '{field}' declared twice in record '{record}'")]
    DuplicateField { record: String, field: String },

    #[error("Record type '{name}' already registered")]
    AlreadyRegistered { name: String },

    #[error("Cannot parse type expression '{input}' at offset {offset}: {message}")]
    Parse {
        input: String,
        offset: usize,
        message: String,
    },

    /// Malformed declaration file.
    #[error("Invalid type declarations: {0}")]
    Declaration(String),

    #[error("Type registry lock poisoned")]
    LockPoisoned,
}

impl TypeError {
    pub(crate) fn unsupported(path: impl Into<String>, reason: impl Into<String>) -> Self {
        TypeError::Unsupported {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
