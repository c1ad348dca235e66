//! Record factory for the tsbench workload schema.
//!
//! One [`RecordFactory`] produces randomized users, devices and events for
//! every backend. The only backend-dependent part of generating a record is
//! how the parent key is chosen, which is described by
//! [`tsbench_core::KeySelection`] and resolved by the executor: either the
//! factory draws uniformly from the parent table's id range
//! ([`RecordFactory::pick_uniform`]) or the engine is asked for a random row.
//!
//! # Example
//!
//! ```rust
//! use chrono::Utc;
//! use tsbench_generator::RecordFactory;
//!
//! let mut factory = RecordFactory::new(42);
//! let event = factory.event(Some(7), Utc::now());
//! assert_eq!(event.device_id, Some(7));
//! ```

pub mod factory;
pub mod timeline;

pub use factory::{RecordFactory, DEFAULT_SEED};
pub use timeline::{Direction, Timeline};
