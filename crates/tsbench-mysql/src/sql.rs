//! SQL text for the MySQL store.

use tsbench_core::Table;

/// Columns written on insert, in placeholder order. Ids come from AUTO_INCREMENT.
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
        Table::Users => "`id` BIGINT NOT NULL AUTO_INCREMENT PRIMARY KEY, \
                         `name` VARCHAR(255), \
                         `created_at` DATETIME(6) NOT NULL",
        Table::Devices => "`id` BIGINT NOT NULL AUTO_INCREMENT PRIMARY KEY, \
                           `name` VARCHAR(255), \
                           `user_id` BIGINT, \
                           `created_at` DATETIME(6) NOT NULL",
        Table::Events => "`id` BIGINT NOT NULL AUTO_INCREMENT PRIMARY KEY, \
                          `value` DOUBLE, \
                          `action` VARCHAR(255), \
                          `payload` JSON, \
                          `device_id` BIGINT, \
                          `created_at` DATETIME(6) NOT NULL",
    };
    format!("CREATE TABLE IF NOT EXISTS `{}` ({columns})", table.name())
}

/// Generate DROP TABLE statement.
pub fn generate_drop_table(table: Table) -> String {
    format!("DROP TABLE IF EXISTS `{}`", table.name())
}

pub fn generate_create_database(name: &str) -> String {
    format!("CREATE DATABASE IF NOT EXISTS `{}`", name.replace('`', "``"))
}

pub fn generate_truncate(table: Table) -> String {
    format!("TRUNCATE TABLE `{}`", table.name())
}

pub fn generate_count(table: Table) -> String {
    format!("SELECT COUNT(*) FROM `{}`", table.name())
}

pub fn generate_random_id(table: Table) -> String {
    format!("SELECT `id` FROM `{}` ORDER BY RAND() LIMIT 1", table.name())
}

pub fn generate_id_range(table: Table) -> String {
    format!("SELECT MIN(`id`), MAX(`id`) FROM `{}`", table.name())
}

/// Multi-row INSERT with `?` placeholders for `rows` rows.
pub fn generate_insert(table: Table, rows: usize) -> String {
    let columns = insert_columns(table);
    let col_placeholders: Vec<&str> = columns.iter().map(|_| "?").collect();
    let row_template = format!("({})", col_placeholders.join(", "));
    let rows_template: Vec<&str> = (0..rows).map(|_| row_template.as_str()).collect();

    format!(
        "INSERT INTO `{}` ({}) VALUES {}",
        table.name(),
        columns
            .iter()
            .map(|c| format!("`{c}`"))
            .collect::<Vec<_>>()
            .join(", "),
        rows_template.join(", ")
    )
}

pub const LATEST_EVENT: &str = "SELECT `id`, `value`, `action`, CAST(`payload` AS CHAR), `device_id`, `created_at` \
     FROM `events` ORDER BY `id` DESC LIMIT 1";

pub const YEARLY_SUMMARY: &str = "SELECT YEAR(`events`.`created_at`) AS `year`, \
            SUM(`events`.`value`), \
            COUNT(`devices`.`id`), \
            COUNT(`users`.`id`) \
     FROM `events` \
     INNER JOIN `devices` ON `devices`.`id` = `events`.`device_id` \
     INNER JOIN `users` ON `users`.`id` = `devices`.`user_id` \
     GROUP BY YEAR(`events`.`created_at`) ORDER BY `year`";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_create_table() {
        let sql = generate_create_table(Table::Devices);

        assert!(sql.starts_with("CREATE TABLE IF NOT EXISTS `devices`"));
        assert!(sql.contains("`id` BIGINT NOT NULL AUTO_INCREMENT PRIMARY KEY"));
        assert!(sql.contains("`user_id` BIGINT"));
        assert!(sql.contains("`created_at` DATETIME(6) NOT NULL"));
    }

    #[test]
    fn test_generate_drop_table() {
        assert_eq!(generate_drop_table(Table::Events), "DROP TABLE IF EXISTS `events`");
    }

    #[test]
    fn test_generate_insert() {
        assert_eq!(
            generate_insert(Table::Users, 3),
            "INSERT INTO `users` (`name`, `created_at`) VALUES (?, ?), (?, ?), (?, ?)"
        );
    }

    #[test]
    fn test_random_id_uses_rand() {
        assert!(generate_random_id(Table::Users).contains("ORDER BY RAND() LIMIT 1"));
    }

    #[test]
    fn test_generate_create_database_escapes_backticks() {
        assert_eq!(
            generate_create_database("te`st"),
            "CREATE DATABASE IF NOT EXISTS `te``st`"
        );
    }
}
