//! # Zonefeed Events
//!
//! This crate defines the messages pushed onto the feature bus for strategy and
//! learning components to consume.
//!
//! As a Layer 0 crate, it depends only on `core-types` and provides the definitive
//! wire format for everything the publisher emits.

// Declare the modules that make up this crate.
pub mod error;
pub mod messages;

// Re-export the core types to provide a clean public API.
pub use error::EventsError;
pub use messages::{BusMessage, FeatureBatch, FeatureFact, LogLevel, LogMessage};
