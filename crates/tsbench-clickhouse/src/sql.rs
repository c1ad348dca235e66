//! SQL text for the ClickHouse store.
//!
//! Parent references are `UInt64` with 0 standing for "no parent", so the
//! MergeTree sorting keys never see NULLs.

use tsbench_core::Table;

pub fn columns(table: Table) -> &'static [&'static str] {
    match table {
        Table::Users => &["id", "name", "created_at"],
        Table::Devices => &["id", "name", "user_id", "created_at"],
        Table::Events => &["id", "value", "action", "payload", "device_id", "created_at"],
    }
}

/// Generate CREATE TABLE statement.
pub fn generate_create_table(table: Table) -> String {
    let (columns, key) = match table {
        Table::Users => (
            "id UInt64, name String, created_at DateTime64(6, 'UTC')",
            "id",
        ),
        Table::Devices => (
            "id UInt64, name String, user_id UInt64, created_at DateTime64(6, 'UTC')",
            "user_id",
        ),
        Table::Events => (
            "id UInt64, value Float64, action String, payload String, \
             device_id UInt64, created_at DateTime64(6, 'UTC')",
            "device_id",
        ),
    };
    format!(
        "CREATE TABLE IF NOT EXISTS {} ({columns}) \
         ENGINE = MergeTree() \
         PARTITION BY toYYYYMM(created_at) \
         ORDER BY (created_at, intHash32({key})) \
         SAMPLE BY intHash32({key})",
        table.name()
    )
}

/// Generate DROP TABLE statement.
pub fn generate_drop_table(table: Table) -> String {
    format!("DROP TABLE IF EXISTS {}", table.name())
}

pub fn generate_create_database(name: &str) -> String {
    format!("CREATE DATABASE IF NOT EXISTS `{}`", name.replace('`', "\\`"))
}

pub fn generate_truncate(table: Table) -> String {
    format!("TRUNCATE TABLE IF EXISTS {}", table.name())
}

pub fn generate_count(table: Table) -> String {
    format!("SELECT count() FROM {} FORMAT TabSeparated", table.name())
}

pub fn generate_max_id(table: Table) -> String {
    format!("SELECT max(id) FROM {} FORMAT TabSeparated", table.name())
}

pub fn generate_random_id(table: Table) -> String {
    format!(
        "SELECT id FROM {} ORDER BY rand() LIMIT 1 FORMAT TabSeparated",
        table.name()
    )
}

pub fn generate_id_range(table: Table) -> String {
    format!(
        "SELECT min(id), max(id), count() FROM {} FORMAT TabSeparated",
        table.name()
    )
}

/// INSERT header; JSONEachRow rows follow on separate lines.
pub fn generate_insert(table: Table) -> String {
    format!(
        "INSERT INTO {} ({}) FORMAT JSONEachRow",
        table.name(),
        columns(table).join(", ")
    )
}

pub const LATEST_EVENT: &str = "SELECT id, value, action, payload, device_id, created_at \
     FROM events ORDER BY id DESC LIMIT 1 FORMAT JSONEachRow";

pub const YEARLY_SUMMARY: &str = "SELECT toInt32(toYear(events.created_at)) AS year, \
            sum(events.value) AS value_sum, \
            toInt64(count(devices.id)) AS device_count, \
            toInt64(count(users.id)) AS user_count \
     FROM events \
     INNER JOIN devices ON devices.id = events.device_id \
     INNER JOIN users ON users.id = devices.user_id \
     GROUP BY year ORDER BY year FORMAT JSONEachRow";
