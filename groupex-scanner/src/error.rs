use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error(
        "Not on the Facebook Groups page (current location: {location}). \
         Open https://www.facebook.com/groups/joins/ and try again."
    )]
    WrongContext { location: String },

    #[error("No active tab found")]
    NoActiveContext,

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Export cancelled")]
    Cancelled,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ExportError>;
