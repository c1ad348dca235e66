//! Timing samples and the per-run result set.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// One timing sample for a single test-case execution. All times are in
/// seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub case_name: String,
    /// CPU time spent in user mode.
    pub user_time: f64,
    /// CPU time spent in kernel mode.
    pub system_time: f64,
    /// `user_time + system_time`.
    pub total_time: f64,
    /// Elapsed real time.
    pub wall_time: f64,
}

/// Process-wide CPU times, as reported by `getrusage(RUSAGE_SELF)`.
///
/// Covers every thread of the process, so work done by runtime worker
/// threads on behalf of a test case is included.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CpuTimes {
    pub user: f64,
    pub system: f64,
}

impl CpuTimes {
    /// Sample the current process CPU times.
    #[cfg(unix)]
    pub fn now() -> Self {
        let mut usage = std::mem::MaybeUninit::<libc::rusage>::zeroed();
        // SAFETY: getrusage only writes into the provided struct.
        let rc = unsafe { libc::getrusage(libc::RUSAGE_SELF, usage.as_mut_ptr()) };
        if rc != 0 {
            return Self::default();
        }
        // SAFETY: rc == 0 means the kernel filled the struct, and it was zeroed before.
        let usage = unsafe { usage.assume_init() };
        Self {
            user: timeval_secs(usage.ru_utime),
            system: timeval_secs(usage.ru_stime),
        }
    }

    /// CPU times are not available on this platform.
    #[cfg(not(unix))]
    pub fn now() -> Self {
        Self::default()
    }
}

#[cfg(unix)]
fn timeval_secs(tv: libc::timeval) -> f64 {
    tv.tv_sec as f64 + tv.tv_usec as f64 / 1_000_000.0
}

/// Measures a region of code in CPU and wall-clock time.
#[derive(Debug, Clone, Copy)]
pub struct Stopwatch {
    cpu: CpuTimes,
    wall: Instant,
}

impl Stopwatch {
    /// Start measuring.
    pub fn start() -> Self {
        Self {
            cpu: CpuTimes::now(),
            wall: Instant::now(),
        }
    }

    /// Stop measuring and produce the sample for `case_name`.
    pub fn stop(self, case_name: impl Into<String>) -> Measurement {
        let wall_time = self.wall.elapsed().as_secs_f64();
        let cpu = CpuTimes::now();
        let user_time = (cpu.user - self.cpu.user).max(0.0);
        let system_time = (cpu.system - self.cpu.system).max(0.0);

        Measurement {
            case_name: case_name.into(),
            user_time,
            system_time,
            total_time: user_time + system_time,
            wall_time,
        }
    }
}

/// Measurements keyed by case name.
///
/// Cases keep the order in which they were first recorded, and samples
/// within a case keep execution order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultSet {
    cases: IndexMap<String, Vec<Measurement>>,
}

impl ResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a measurement under its case name.
    pub fn record(&mut self, measurement: Measurement) {
        self.cases
            .entry(measurement.case_name.clone())
            .or_default()
            .push(measurement);
    }

    /// All samples recorded for a case.
    pub fn get(&self, case_name: &str) -> Option<&[Measurement]> {
        self.cases.get(case_name).map(Vec::as_slice)
    }

    /// The first sample recorded for a case.
    pub fn first(&self, case_name: &str) -> Option<&Measurement> {
        self.cases.get(case_name).and_then(|m| m.first())
    }

    /// Case names in first-recorded order.
    pub fn case_names(&self) -> impl Iterator<Item = &str> {
        self.cases.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Measurement])> {
        self.cases.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Number of distinct cases.
    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    /// Number of samples across all cases.
    pub fn sample_count(&self) -> usize {
        self.cases.values().map(Vec::len).sum()
    }
}
