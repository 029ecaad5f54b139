#![forbid(unsafe_code)]

#[derive(Debug)]
pub enum StoreError {
    Io(std::io::Error),
    Sql(rusqlite::Error),
    InvalidInput(&'static str),
    /// The alias value already carries an active alias edge for this owner;
    /// the existing edge must be retired before a new one can be declared.
    AliasConflict {
        alias: String,
        existing_root: String,
    },
    /// An identity value cannot alias itself.
    SelfAlias,
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "io: {err}"),
            Self::Sql(err) => write!(f, "sqlite: {err}"),
            Self::InvalidInput(message) => write!(f, "invalid input: {message}"),
            Self::AliasConflict {
                alias,
                existing_root,
            } => write!(
                f,
                "alias conflict (alias={alias} already resolves to root={existing_root})"
            ),
            Self::SelfAlias => write!(f, "an identity value cannot alias itself"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<std::io::Error> for StoreError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sql(value)
    }
}
