//! Workload record types.
//!
//! The benchmark schema is a three-level hierarchy: a [`User`] owns many
//! [`Device`]s and a device emits many [`Event`]s. References between the
//! records are plain ids; enforcing them is left to the backend schema.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Tables
// ============================================================================

/// The three relations every backend provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Table {
    Users,
    Devices,
    Events,
}

impl Table {
    /// All tables, parents first.
    pub const ALL: [Table; 3] = [Table::Users, Table::Devices, Table::Events];

    /// Table name as used in SQL.
    pub fn name(&self) -> &'static str {
        match self {
            Table::Users => "users",
            Table::Devices => "devices",
            Table::Events => "events",
        }
    }

    /// The table referenced by this table's foreign key, if any.
    pub fn parent(&self) -> Option<Table> {
        match self {
            Table::Users => None,
            Table::Devices => Some(Table::Users),
            Table::Events => Some(Table::Devices),
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// Records
// ============================================================================

/// A user. `id` is `None` until the record has been stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Option<i64>,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// A device owned by a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub id: Option<i64>,
    pub name: String,
    /// Owning user; empty when no users existed at generation time.
    pub user_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// An event emitted by a device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: Option<i64>,
    pub value: f64,
    pub action: Action,
    pub payload: serde_json::Value,
    /// Emitting device; empty when no devices existed at generation time.
    pub device_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// Kind of change an event describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Create,
    Update,
    Destroy,
}

impl Action {
    pub const ALL: [Action; 3] = [Action::Create, Action::Update, Action::Destroy];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Create => "create",
            Action::Update => "update",
            Action::Destroy => "destroy",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a stored action string is not a known [`Action`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown event action: {0}")]
pub struct ParseActionError(pub String);

impl FromStr for Action {
    type Err = ParseActionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "create" => Ok(Action::Create),
            "update" => Ok(Action::Update),
            "destroy" => Ok(Action::Destroy),
            _ => Err(ParseActionError(s.to_string())),
        }
    }
}

/// One row of the yearly aggregate read by the complex reader workload:
/// `SUM(events.value)`, `COUNT(devices.id)` and `COUNT(users.id)` grouped by
/// the event year over the events → devices → users join.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearlySummary {
    pub year: i32,
    pub value_sum: f64,
    pub device_count: i64,
    pub user_count: i64,
}

// ============================================================================
// Key selection
// ============================================================================

/// Strategy used to pick a random parent id for a new record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeySelection {
    /// Pick uniformly between the smallest and largest stored id.
    Uniform,
    /// Let the engine pick (`ORDER BY random() LIMIT 1` and friends).
    EngineRandom,
}

impl fmt::Display for KeySelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeySelection::Uniform => write!(f, "uniform"),
            KeySelection::EngineRandom => write!(f, "engine_random"),
        }
    }
}

/// Inclusive id bounds of a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyRange {
    pub min: i64,
    pub max: i64,
}

impl KeyRange {
    /// Build a range, returning `None` when `min > max`.
    pub fn new(min: i64, max: i64) -> Option<Self> {
        (min <= max).then_some(Self { min, max })
    }

    pub fn contains(&self, id: i64) -> bool {
        self.min <= id && id <= self.max
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_parents() {
        assert_eq!(Table::Users.parent(), None);
        assert_eq!(Table::Devices.parent(), Some(Table::Users));
        assert_eq!(Table::Events.parent(), Some(Table::Devices));
        assert_eq!(Table::Events.to_string(), "events");
    }

    #[test]
    fn test_action_round_trip_through_str() {
        for action in Action::ALL {
            assert_eq!(action.as_str().parse::<Action>().unwrap(), action);
        }
        assert_eq!("DESTROY".parse::<Action>().unwrap(), Action::Destroy);
        assert!("explode".parse::<Action>().is_err());
    }

    #[test]
    fn test_key_range() {
        assert!(KeyRange::new(5, 1).is_none());
        let range = KeyRange::new(1, 10).unwrap();
        assert!(range.contains(1));
        assert!(range.contains(10));
        assert!(!range.contains(11));
    }

    #[test]
    fn test_key_selection_serde_names() {
        let parsed: KeySelection = serde_yaml::from_str("engine_random").unwrap();
        assert_eq!(parsed, KeySelection::EngineRandom);
        let parsed: KeySelection = serde_yaml::from_str("uniform").unwrap();
        assert_eq!(parsed, KeySelection::Uniform);
    }
}
