use thiserror::Error;

#[derive(Error, Debug)]
pub enum EventsError {
    #[error("Failed to serialize bus message: {0}")]
    Serialization(String),
}
