use crate::error::EventsError;
use chrono::{DateTime, Utc};
use core_types::ZoneSnapshot;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

/// Enum representing the severity of a log message for structured logging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLevel {
    Info,
}

/// A structured log message carried on the bus alongside features.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogMessage {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
}

/// One named scalar, e.g. `zone.breakout_score`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureFact {
    pub name: String,
    pub value: f64,
}

/// The facts published for one symbol at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureBatch {
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub facts: Vec<FeatureFact>,
}

impl FeatureBatch {
    /// Converts a snapshot into bus facts, stamped with `timestamp`.
    ///
    /// Decimal values become `f64` here; the "no zone" sentinel becomes a very
    /// large finite number.
    pub fn from_snapshot(snapshot: &ZoneSnapshot, timestamp: DateTime<Utc>) -> Self {
        let facts = snapshot
            .features()
            .iter()
            .map(|(name, value)| FeatureFact {
                name: (*name).to_string(),
                value: value.to_f64().unwrap_or(f64::MAX),
            })
            .collect();
        Self {
            symbol: snapshot.symbol.clone(),
            timestamp,
            facts,
        }
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.facts.iter().find(|fact| fact.name == name).map(|fact| fact.value)
    }
}

/// The top-level feature bus message.
///
/// Serialized as `{"type": "...", "payload": {...}}`. For example:
/// `{
///   "type": "Features",
///   "payload": { "symbol": "ES", "timestamp": "...", "facts": [...] }
/// }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum BusMessage {
    /// Zone features for one symbol.
    Features(FeatureBatch),
    /// A publisher lifecycle notice.
    Log(LogMessage),
}

impl BusMessage {
    pub fn to_json(&self) -> Result<String, EventsError> {
        serde_json::to_string(self).map_err(|e| EventsError::Serialization(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    #[test]
    fn batch_carries_the_four_zone_facts() {
        let mut snapshot = ZoneSnapshot::neutral("ES");
        snapshot.breakout_score = dec!(0.75);
        snapshot.pressure = dec!(0.5);
        snapshot.dist_to_demand_atr = dec!(1.25);

        let ts = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let batch = FeatureBatch::from_snapshot(&snapshot, ts);
        assert_eq!(batch.symbol, "ES");
        assert_eq!(batch.timestamp, ts);
        assert_eq!(batch.facts.len(), 4);
        assert_eq!(batch.get("zone.breakout_score"), Some(0.75));
        assert_eq!(batch.get("zone.pressure"), Some(0.5));
        assert_eq!(batch.get("zone.dist_to_demand_atr"), Some(1.25));
        assert!(batch.get("zone.dist_to_supply_atr").unwrap() > 1e28);
        assert_eq!(batch.get("zone.unknown"), None);
    }

    #[test]
    fn bus_message_uses_type_and_payload_tags() {
        let message = BusMessage::Log(LogMessage {
            timestamp: Utc.timestamp_opt(0, 0).unwrap(),
            level: LogLevel::Info,
            message: "publisher started".to_string(),
        });
        let json = message.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["type"], "Log");
        assert_eq!(value["payload"]["level"], "Info");

        let decoded: BusMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, message);
    }
}
