use std::fmt;

/// The two kinds of identifiers a rating refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    User,
    Item,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::User => write!(f, "user"),
            EntityKind::Item => write!(f, "item"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("malformed rating record on line {line}: {reason}")]
    MalformedRecord { line: usize, reason: String },

    #[error("unknown {kind} identifier `{id}`")]
    UnknownIdentifier { kind: EntityKind, id: String },

    #[error("{kind} index {index} is out of range (0..{len})")]
    IndexOutOfRange {
        kind: EntityKind,
        index: usize,
        len: usize,
    },

    #[error("cutoff positions do not align: expected {expected:?}, got {actual:?}")]
    DimensionMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("the {0} model has not been trained")]
    NotTrained(&'static str),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
