use serde::{Deserialize, Serialize};

/// Which side of the market a zone supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ZoneSide {
    /// Support below price.
    Demand,
    /// Resistance above price.
    Supply,
}

/// Lifecycle state of a zone.
///
/// Every zone starts in `Test`. The per-bar updater moves it between `Test`,
/// `Breakout` and `Retest`; `Invalidated` is never set by the updater and only
/// serves as a pruning criterion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ZoneState {
    #[default]
    Test,
    Breakout,
    Retest,
    Invalidated,
}
