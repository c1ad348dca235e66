//! SQL text for the PostgreSQL and TimescaleDB stores.

use tsbench_core::Table;

/// Which engine the store talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flavor {
    /// Plain PostgreSQL.
    Plain,
    /// PostgreSQL with the timescaledb extension; events become a hypertable
    /// partitioned on `created_at`.
    Timescale,
}

impl Flavor {
    pub fn backend(self) -> &'static str {
        match self {
            Flavor::Plain => "postgres",
            Flavor::Timescale => "timescale_db",
        }
    }
}

/// Columns written on insert, in placeholder order. Ids come from BIGSERIAL.
pub fn insert_columns(table: Table) -> &'static [&'static str] {
    match table {
        Table::Users => &["name", "created_at"],
        Table::Devices => &["name", "user_id", "created_at"],
        Table::Events => &["value", "action", "payload", "device_id", "created_at"],
    }
}

/// Generate CREATE TABLE statement.
pub fn generate_create_table(table: Table) -> String {
    let columns = match table {
        Table::Users => "\"id\" BIGSERIAL PRIMARY KEY, \
                         \"name\" VARCHAR(255), \
                         \"created_at\" TIMESTAMPTZ NOT NULL",
        Table::Devices => "\"id\" BIGSERIAL PRIMARY KEY, \
                           \"name\" VARCHAR(255), \
                           \"user_id\" INT8, \
                           \"created_at\" TIMESTAMPTZ NOT NULL",
        Table::Events => "\"id\" BIGSERIAL PRIMARY KEY, \
                          \"value\" FLOAT8, \
                          \"action\" VARCHAR(255), \
                          \"payload\" JSONB, \
                          \"device_id\" INT8, \
                          \"created_at\" TIMESTAMPTZ NOT NULL",
    };
    format!("CREATE TABLE IF NOT EXISTS \"{}\" ({columns})", table.name())
}

/// Generate DROP TABLE statement.
pub fn generate_drop_table(table: Table) -> String {
    format!("DROP TABLE IF EXISTS \"{}\"", table.name())
}

pub fn generate_truncate(table: Table) -> String {
    format!("TRUNCATE TABLE \"{}\"", table.name())
}

pub fn generate_count(table: Table) -> String {
    format!("SELECT COUNT(*) FROM \"{}\"", table.name())
}

pub fn generate_random_id(table: Table) -> String {
    format!(
        "SELECT \"id\" FROM \"{}\" ORDER BY random() LIMIT 1",
        table.name()
    )
}

pub fn generate_id_range(table: Table) -> String {
    format!("SELECT MIN(\"id\"), MAX(\"id\") FROM \"{}\"", table.name())
}

/// Multi-row INSERT with `$n` placeholders for `rows` rows.
pub fn generate_insert(table: Table, rows: usize) -> String {
    let columns = insert_columns(table);
    let mut param_idx = 1;
    let placeholders: Vec<String> = (0..rows)
        .map(|_| {
            let row: Vec<String> = columns
                .iter()
                .map(|_| {
                    let p = format!("${param_idx}");
                    param_idx += 1;
                    p
                })
                .collect();
            format!("({})", row.join(", "))
        })
        .collect();

    format!(
        "INSERT INTO \"{}\" ({}) VALUES {}",
        table.name(),
        columns
            .iter()
            .map(|c| format!("\"{c}\""))
            .collect::<Vec<_>>()
            .join(", "),
        placeholders.join(", ")
    )
}

pub const LATEST_EVENT: &str = "SELECT \"id\", \"value\", \"action\", \"payload\", \"device_id\", \"created_at\" \
     FROM \"events\" ORDER BY \"id\" DESC LIMIT 1";

pub const YEARLY_SUMMARY: &str = "SELECT EXTRACT(YEAR FROM \"events\".\"created_at\")::INT4 AS year, \
            SUM(\"events\".\"value\")::FLOAT8 AS value_sum, \
            COUNT(\"devices\".\"id\") AS device_count, \
            COUNT(\"users\".\"id\") AS user_count \
     FROM \"events\" \
     INNER JOIN \"devices\" ON \"devices\".\"id\" = \"events\".\"device_id\" \
     INNER JOIN \"users\" ON \"users\".\"id\" = \"devices\".\"user_id\" \
     GROUP BY 1 ORDER BY 1";

/// Statements run before the tables are created.
pub fn setup_prologue(flavor: Flavor) -> Vec<String> {
    match flavor {
        Flavor::Plain => Vec::new(),
        Flavor::Timescale => vec!["CREATE EXTENSION IF NOT EXISTS timescaledb".to_string()],
    }
}

/// Statements run after the tables are created.
pub fn setup_epilogue(flavor: Flavor) -> Vec<String> {
    match flavor {
        Flavor::Plain => Vec::new(),
        Flavor::Timescale => vec![
            // Hypertables need the partition column in every unique index.
            "ALTER TABLE \"events\" DROP CONSTRAINT IF EXISTS events_pkey".to_string(),
            "SELECT create_hypertable('events', 'created_at', \
             if_not_exists => true, migrate_data => true)"
                .to_string(),
        ],
    }
}
