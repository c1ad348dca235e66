//! Tabular rendering of a result set.

use comfy_table::{presets::UTF8_FULL, Cell, Table};
use tsbench_core::{Measurement, ResultSet};

pub const HEADINGS: [&str; 5] = ["Test case", "User", "System", "Total", "Real"];

/// Decimal places used when the configuration does not set `float_precision`.
pub const DEFAULT_PRECISION: usize = 6;

/// Seconds rounded to `precision` decimals with an `s` suffix.
pub fn format_seconds(seconds: f64, precision: usize) -> String {
    format!("{seconds:.precision$}s")
}

/// Renders one row per test case from its first measurement.
#[derive(Debug, Clone, Copy)]
pub struct Reporter {
    precision: usize,
}

impl Default for Reporter {
    fn default() -> Self {
        Self::new(DEFAULT_PRECISION)
    }
}

impl Reporter {
    pub fn new(precision: usize) -> Self {
        Self { precision }
    }

    pub fn row(&self, measurement: &Measurement) -> [String; 5] {
        [
            measurement.case_name.clone(),
            format_seconds(measurement.user_time, self.precision),
            format_seconds(measurement.system_time, self.precision),
            format_seconds(measurement.total_time, self.precision),
            format_seconds(measurement.wall_time, self.precision),
        ]
    }

    pub fn table(&self, results: &ResultSet) -> Table {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.set_header(HEADINGS.to_vec());

        // Repeated runs keep every sample; only the first is shown.
        for (_, samples) in results.iter() {
            if let Some(first) = samples.first() {
                table.add_row(self.row(first).iter().map(Cell::new).collect::<Vec<_>>());
            }
        }

        table
    }

    /// The title in upper case, then the table.
    pub fn render(&self, title: &str, results: &ResultSet) -> String {
        format!("{}\n{}", title.to_uppercase(), self.table(results))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn measurement(case_name: &str, total_time: f64) -> Measurement {
        Measurement {
            case_name: case_name.to_string(),
            user_time: 0.5,
            system_time: 0.25,
            total_time,
            wall_time: 2.0,
        }
    }

    #[test]
    fn test_format_seconds_rounds_to_precision() {
        assert_eq!(format_seconds(1.23456789, 6), "1.234568s");
        assert_eq!(format_seconds(1.23456789, 2), "1.23s");
        assert_eq!(format_seconds(0.0, 3), "0.000s");
    }

    #[test]
    fn test_row_uses_configured_precision() {
        let row = Reporter::default().row(&measurement("bulk_insert", 1.23456789));
        assert_eq!(
            row,
            [
                "bulk_insert".to_string(),
                "0.500000s".to_string(),
                "0.250000s".to_string(),
                "1.234568s".to_string(),
                "2.000000s".to_string(),
            ]
        );
    }

    #[test]
    fn test_render_shows_first_sample_only() {
        let mut results = ResultSet::new();
        results.record(measurement("bulk_insert", 1.0));
        results.record(measurement("bulk_insert", 9.0));
        results.record(measurement("parallel_simple_rw", 3.0));

        let output = Reporter::new(1).render("postgres", &results);

        assert!(output.starts_with("POSTGRES\n"));
        for heading in HEADINGS {
            assert!(output.contains(heading));
        }
        assert!(output.contains("1.0s"));
        assert!(!output.contains("9.0s"));
        assert!(output.contains("parallel_simple_rw"));
    }

    #[test]
    fn test_table_has_one_row_per_case() {
        let mut results = ResultSet::new();
        results.record(measurement("a", 1.0));
        results.record(measurement("b", 1.0));

        let table = Reporter::default().table(&results);
        assert_eq!(table.row_iter().count(), 2);
    }
}
