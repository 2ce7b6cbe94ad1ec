//! SQL dialect capabilities.
//!
//! Everything that differs between backends is answered here. Statement
//! construction in [`crate::queries`] only talks to this trait.

/// Backend-specific SQL fragments.
pub trait SqlDialect: Send + Sync {
    fn name(&self) -> &'static str;

    /// Bind placeholder for the 1-based parameter `index`.
    fn placeholder(&self, index: usize) -> String;

    fn quote_ident(&self, ident: &str) -> String;

    /// Full column definition of the autoincrement surrogate key.
    fn surrogate_key(&self, column: &str) -> String;

    fn text_type(&self) -> &'static str;

    fn float_type(&self) -> &'static str;

    /// Column type holding a naive UTC timestamp with microseconds.
    fn timestamp_type(&self) -> &'static str;

    /// Trailing `CREATE TABLE` options.
    fn table_options(&self) -> &'static str {
        ""
    }

    /// `INSERT` that silently skips rows violating a unique key.
    fn insert_ignore(&self, table: &str, columns: &[String], values: &[String]) -> String;

    /// Placeholder for a timestamp parameter bound as text.
    fn timestamp_param(&self, index: usize) -> String {
        self.placeholder(index)
    }

    /// Projection of a timestamp column as text.
    fn timestamp_text(&self, column: &str) -> String {
        column.to_string()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresDialect;

impl SqlDialect for PostgresDialect {
    fn name(&self) -> &'static str {
        "postgresql"
    }

    fn placeholder(&self, index: usize) -> String {
        format!("${index}")
    }

    fn quote_ident(&self, ident: &str) -> String {
        format!("\"{ident}\"")
    }

    fn surrogate_key(&self, column: &str) -> String {
        format!("{} BIGSERIAL PRIMARY KEY", self.quote_ident(column))
    }

    fn text_type(&self) -> &'static str {
        "VARCHAR(100)"
    }

    fn float_type(&self) -> &'static str {
        "DOUBLE PRECISION"
    }

    fn timestamp_type(&self) -> &'static str {
        "TIMESTAMP(6)"
    }

    fn insert_ignore(&self, table: &str, columns: &[String], values: &[String]) -> String {
        format!(
            "INSERT INTO {table} ({}) VALUES ({}) ON CONFLICT DO NOTHING",
            columns.join(", "),
            values.join(", ")
        )
    }

    fn timestamp_param(&self, index: usize) -> String {
        format!("CAST(${index} AS TIMESTAMP)")
    }

    fn timestamp_text(&self, column: &str) -> String {
        format!("CAST({column} AS TEXT)")
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlDialect;

impl SqlDialect for MySqlDialect {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn placeholder(&self, _index: usize) -> String {
        "?".to_string()
    }

    fn quote_ident(&self, ident: &str) -> String {
        format!("`{ident}`")
    }

    fn surrogate_key(&self, column: &str) -> String {
        format!("{} BIGINT AUTO_INCREMENT PRIMARY KEY", self.quote_ident(column))
    }

    fn text_type(&self) -> &'static str {
        "VARCHAR(100)"
    }

    fn float_type(&self) -> &'static str {
        "DOUBLE"
    }

    fn timestamp_type(&self) -> &'static str {
        "DATETIME(6)"
    }

    fn table_options(&self) -> &'static str {
        " ENGINE=InnoDB DEFAULT CHARSET=utf8mb4"
    }

    fn insert_ignore(&self, table: &str, columns: &[String], values: &[String]) -> String {
        format!(
            "INSERT IGNORE INTO {table} ({}) VALUES ({})",
            columns.join(", "),
            values.join(", ")
        )
    }

    fn timestamp_text(&self, column: &str) -> String {
        format!("CAST({column} AS CHAR)")
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteDialect;

impl SqlDialect for SqliteDialect {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn placeholder(&self, _index: usize) -> String {
        "?".to_string()
    }

    fn quote_ident(&self, ident: &str) -> String {
        format!("\"{ident}\"")
    }

    fn surrogate_key(&self, column: &str) -> String {
        format!("{} INTEGER PRIMARY KEY AUTOINCREMENT", self.quote_ident(column))
    }

    fn text_type(&self) -> &'static str {
        "TEXT"
    }

    fn float_type(&self) -> &'static str {
        "REAL"
    }

    // Fixed-width text so lexical order matches time order.
    fn timestamp_type(&self) -> &'static str {
        "TEXT"
    }

    fn insert_ignore(&self, table: &str, columns: &[String], values: &[String]) -> String {
        format!(
            "INSERT OR IGNORE INTO {table} ({}) VALUES ({})",
            columns.join(", "),
            values.join(", ")
        )
    }
}
