use thiserror::Error;

#[derive(Error, Debug)]
pub enum ZoneError {
    #[error("Zone component received invalid parameters: {0}")]
    InvalidParameters(String),
}
