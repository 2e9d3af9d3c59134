use thiserror::Error;

#[derive(Error, Debug)]
pub enum PublisherError {
    #[error("Publisher is misconfigured: {0}")]
    Configuration(#[from] configuration::ConfigError),

    #[error("Feature sink is closed: {0}")]
    SinkClosed(String),

    #[error("Failed to encode bus message: {0}")]
    Events(#[from] events::EventsError),
}
