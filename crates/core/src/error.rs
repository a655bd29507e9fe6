use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Invalid match time '{value}': {reason}")]
    InvalidMatchTime { value: String, reason: String },

    #[error("Invalid match record: {0}")]
    InvalidRecord(String),

    #[error("Unknown milestone: {0}")]
    UnknownMilestone(String),

    #[error("Invalid config value for {key}: {value}")]
    InvalidConfig { key: String, value: String },

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}
