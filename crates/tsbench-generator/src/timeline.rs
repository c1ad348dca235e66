//! Monotonic timestamp sequences for the sequential insert cases.

use chrono::{DateTime, Duration, Utc};

/// Direction a [`Timeline`] moves in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// Strictly monotonic timestamps one step apart.
///
/// Inserting events in timeline order exercises index locality: ascending
/// timestamps always append to the right edge of a time index, descending
/// ones to the left.
#[derive(Debug, Clone)]
pub struct Timeline {
    next: DateTime<Utc>,
    step: Duration,
}

impl Timeline {
    pub fn new(start: DateTime<Utc>, direction: Direction) -> Self {
        let step = match direction {
            Direction::Ascending => Duration::seconds(1),
            Direction::Descending => Duration::seconds(-1),
        };
        Self { next: start, step }
    }

    pub fn ascending(start: DateTime<Utc>) -> Self {
        Self::new(start, Direction::Ascending)
    }

    pub fn descending(start: DateTime<Utc>) -> Self {
        Self::new(start, Direction::Descending)
    }
}

impl Iterator for Timeline {
    type Item = DateTime<Utc>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next;
        self.next = current + self.step;
        Some(current)
    }
}
