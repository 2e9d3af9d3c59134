use crate::ZoneCandidate;
use configuration::ZoneParams;
use core_types::{Zone, ZoneSide, ZoneState};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashSet;

/// What happened to a candidate passed to `ZoneBook::add_or_merge`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// The candidate became a new zone with this id.
    Appended(u64),
    /// The candidate was absorbed into the existing zone with this id.
    Merged(u64),
}

/// The live zones of one symbol.
///
/// Zones are kept in insertion order and scanned linearly; the cap keeps the
/// list short enough that an index or tree would not pay for itself.
#[derive(Debug, Clone)]
pub struct ZoneBook {
    zones: Vec<Zone>,
    next_id: u64,
    max_zones: usize,
    min_touches_to_keep: u32,
}

impl ZoneBook {
    pub fn new(params: &ZoneParams) -> Self {
        Self {
            zones: Vec::new(),
            next_id: 1,
            max_zones: params.max_zones_per_symbol.max(1),
            min_touches_to_keep: params.min_touches_to_keep,
        }
    }

    /// Merges `candidate` into the first same-side zone within reach, or appends it.
    ///
    /// A zone is within reach when the two bands are not separated by more than
    /// the candidate's own thickness. A merged zone covers the union of both
    /// bands, sums their touches, resets to `Test` and gets the pressure
    /// `min(1, (p1 + p2) * 0.6 + 0.4)`.
    pub fn add_or_merge(&mut self, candidate: ZoneCandidate) -> MergeOutcome {
        let reach = candidate.thickness();
        let existing = self.zones.iter_mut().find(|zone| {
            zone.side == candidate.side
                && candidate.low <= zone.high + reach
                && candidate.high >= zone.low - reach
        });

        let outcome = match existing {
            Some(zone) => {
                zone.low = zone.low.min(candidate.low);
                zone.high = zone.high.max(candidate.high);
                zone.touch_count = zone.touch_count.saturating_add(candidate.touch_count);
                zone.pressure = ((zone.pressure + candidate.pressure) * dec!(0.6) + dec!(0.4))
                    .min(Decimal::ONE);
                zone.last_touched = candidate.detected_at;
                zone.state = ZoneState::Test;
                MergeOutcome::Merged(zone.id)
            }
            None => {
                let id = self.next_id;
                self.next_id += 1;
                self.zones.push(Zone {
                    id,
                    side: candidate.side,
                    low: candidate.low,
                    high: candidate.high,
                    pressure: candidate.pressure.clamp(Decimal::ZERO, Decimal::ONE),
                    touch_count: candidate.touch_count,
                    last_touched: candidate.detected_at,
                    state: ZoneState::Test,
                });
                MergeOutcome::Appended(id)
            }
        };

        if self.zones.len() > self.max_zones {
            self.prune();
        }
        outcome
    }

    /// Brings the book back under its cap. Returns the number of zones removed.
    ///
    /// Invalidated zones and zones with `min_touches_to_keep` touches or fewer go
    /// first. If that is not enough, the weakest remaining zones (lowest
    /// pressure, then least recently touched) are evicted.
    pub fn prune(&mut self) -> usize {
        if self.zones.len() <= self.max_zones {
            return 0;
        }
        let before = self.zones.len();
        let min_touches = self.min_touches_to_keep;
        self.zones.retain(|zone| {
            zone.state != ZoneState::Invalidated && zone.touch_count > min_touches
        });

        if self.zones.len() > self.max_zones {
            let excess = self.zones.len() - self.max_zones;
            let mut ranked: Vec<&Zone> = self.zones.iter().collect();
            ranked.sort_by(|a, b| {
                a.pressure
                    .cmp(&b.pressure)
                    .then(a.last_touched.cmp(&b.last_touched))
            });
            let evicted: HashSet<u64> = ranked.iter().take(excess).map(|zone| zone.id).collect();
            self.zones.retain(|zone| !evicted.contains(&zone.id));
        }

        let removed = before - self.zones.len();
        tracing::debug!(removed, remaining = self.zones.len(), "Zone book pruned.");
        removed
    }

    /// The closest demand zone entirely at or below `price`.
    pub fn nearest_demand(&self, price: Decimal) -> Option<&Zone> {
        self.zones
            .iter()
            .filter(|zone| zone.side == ZoneSide::Demand && zone.high <= price)
            .max_by(|a, b| a.high.cmp(&b.high))
    }

    /// The closest supply zone entirely at or above `price`.
    pub fn nearest_supply(&self, price: Decimal) -> Option<&Zone> {
        self.zones
            .iter()
            .filter(|zone| zone.side == ZoneSide::Supply && zone.low >= price)
            .min_by(|a, b| a.low.cmp(&b.low))
    }

    pub fn zones(&self) -> &[Zone] {
        &self.zones
    }

    pub fn zones_mut(&mut self) -> &mut [Zone] {
        &mut self.zones
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }
}
