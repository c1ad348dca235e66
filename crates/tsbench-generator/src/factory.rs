//! Randomized record construction.

use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tsbench_core::{Action, Device, Event, KeyRange, User};

/// Seed used when the configuration does not provide one.
pub const DEFAULT_SEED: u64 = 42;

/// Random timestamps fall within this many days before "now".
const TIMESTAMP_SPREAD_DAYS: i64 = 3 * 365;

/// Produces randomized workload records.
///
/// The factory is deterministic for a given seed. Concurrent tasks each get
/// their own stream via [`RecordFactory::fork`], so no RNG is shared between
/// tasks.
#[derive(Debug, Clone)]
pub struct RecordFactory {
    seed: u64,
    rng: StdRng,
    anchor: DateTime<Utc>,
}

impl RecordFactory {
    /// Create a factory anchored at the current time.
    pub fn new(seed: u64) -> Self {
        Self::with_anchor(seed, Utc::now())
    }

    /// Create a factory whose random timestamps end at `anchor`.
    pub fn with_anchor(seed: u64, anchor: DateTime<Utc>) -> Self {
        Self {
            seed,
            rng: StdRng::seed_from_u64(seed),
            anchor,
        }
    }

    /// Derive an independent factory for stream number `stream`.
    pub fn fork(&self, stream: u64) -> Self {
        let seed = self
            .seed
            .wrapping_add(stream.wrapping_add(1).wrapping_mul(0x9E37_79B9_7F4A_7C15));
        Self::with_anchor(seed, self.anchor)
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn user(&mut self, created_at: DateTime<Utc>) -> User {
        User {
            id: None,
            name: self.hex_name(),
            created_at,
        }
    }

    pub fn device(&mut self, user_id: Option<i64>, created_at: DateTime<Utc>) -> Device {
        Device {
            id: None,
            name: self.hex_name(),
            user_id,
            created_at,
        }
    }

    pub fn event(&mut self, device_id: Option<i64>, created_at: DateTime<Utc>) -> Event {
        let action = *Action::ALL
            .choose(&mut self.rng)
            .unwrap_or(&Action::Create);
        let value: f64 = self.rng.gen();
        let sample: u32 = self.rng.gen_range(0..1_000_000);

        Event {
            id: None,
            value,
            action,
            payload: serde_json::json!({ "foo": "bar", "sample": sample }),
            device_id,
            created_at,
        }
    }

    /// A timestamp drawn uniformly from the last three years.
    pub fn random_timestamp(&mut self) -> DateTime<Utc> {
        let spread = Duration::days(TIMESTAMP_SPREAD_DAYS).num_seconds();
        let offset = self.rng.gen_range(0..=spread);
        self.anchor - Duration::seconds(offset)
    }

    /// Pick an id uniformly from `range`.
    pub fn pick_uniform(&mut self, range: KeyRange) -> i64 {
        self.rng.gen_range(range.min..=range.max)
    }

    /// 32 hex characters, the shape of an MD5 digest.
    fn hex_name(&mut self) -> String {
        format!("{:032x}", self.rng.gen::<u128>())
    }
}
