use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] configuration::ConfigError),

    #[error("Invalid market data: {0}")]
    Core(#[from] core_types::CoreError),

    #[error("Zone component error: {0}")]
    Zone(#[from] zones::ZoneError),
}
