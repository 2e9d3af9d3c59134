use std::path::Path;

// Declare the modules that make up this crate.
pub mod error;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use error::ConfigError;
pub use settings::{Config, LogFormat, LoggingSettings, PublisherSettings, ZoneParams};

/// Prefix of environment variables that override file values,
/// e.g. `ZONEFEED__ZONES__ATR_PERIOD=21`.
pub const ENV_PREFIX: &str = "ZONEFEED";

/// Loads the application configuration from the `config.toml` file.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from("config.toml")
}

/// Loads, deserializes and validates the configuration at `path`.
///
/// Environment variables with the `ZONEFEED` prefix are layered on top of the
/// file. A missing file, a missing mandatory section or an invalid value is an
/// error; nothing is silently defaulted past this point.
pub fn load_config_from(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let builder = config::Config::builder()
        .add_source(config::File::from(path))
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    // Attempt to deserialize the entire configuration into our `Config` struct
    let config = builder.try_deserialize::<Config>()?;
    config.validate()?;

    tracing::debug!(path = %path.display(), "Configuration loaded and validated.");
    Ok(config)
}
