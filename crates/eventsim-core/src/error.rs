use thiserror::Error;

#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("failed to encode batch: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("webhook request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("webhook answered with status {status}")]
    Status { status: u16 },
}

pub type Result<T> = std::result::Result<T, DeliveryError>;
