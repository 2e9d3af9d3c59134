//! # Zone Analytics
//!
//! Online and stateless numerics used by the zone engine.
//!
//! ## Architectural Principles
//!
//! - **Layer 1 Logic:** This is a pure logic crate. It has no knowledge of external systems.
//!   It depends only on `core-types` (Layer 0).
//! - **Decimal First:** Every price-derived quantity is a `Decimal`. Floating point is only
//!   used inside the logistic function of the scorer.
//!
//! ## Public API
//!
//! - `SmoothedRange`: Wilder-smoothed average true range, one instance per symbol.
//! - `BarHistory`: bounded, oldest-evicting store of recent bars.
//! - `BreakoutScorer`: the bounded breakout score for an opposing zone.

// Declare the modules that constitute this crate.
pub mod atr;
pub mod history;
pub mod scorer;

// Re-export the key components to create a clean, public-facing API.
pub use atr::SmoothedRange;
pub use history::BarHistory;
pub use scorer::{BreakoutScorer, ScoreInputs};
