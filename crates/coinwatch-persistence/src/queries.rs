//! Statements for the price series table, rendered once per dialect.

use crate::dialect::SqlDialect;

/// Alias of the timestamp projection in every `SELECT`.
pub const TS_ALIAS: &str = "ts";

/// Prepared SQL text for every store operation.
#[derive(Debug, Clone)]
pub struct SeriesQueries {
    pub create_table: String,
    pub insert: String,
    pub select_range: String,
    pub delete_before: String,
    pub select_latest: String,
    pub count_all: String,
    pub count_coin: String,
}

impl SeriesQueries {
    pub fn new(dialect: &dyn SqlDialect, table: &str) -> Self {
        let d = dialect;
        let table_q = d.quote_ident(table);
        let ts = d.quote_ident("timestamp");
        let text = d.text_type();
        let float = d.float_type();

        let create_table = format!(
            "CREATE TABLE IF NOT EXISTS {table_q} (\
             {id}, \
             coin_id {text} NOT NULL, \
             coin_name {text} NOT NULL, \
             price_usd {float} NOT NULL, \
             market_cap {float} NOT NULL, \
             volume_24h {float}, \
             price_change_percentage_24h {float}, \
             {ts} {ts_type} NOT NULL, \
             UNIQUE (coin_id, {ts})\
             ){options}",
            id = d.surrogate_key("id"),
            ts_type = d.timestamp_type(),
            options = d.table_options(),
        );

        let columns: Vec<String> = [
            "coin_id",
            "coin_name",
            "price_usd",
            "market_cap",
            "volume_24h",
            "price_change_percentage_24h",
        ]
        .iter()
        .map(|c| c.to_string())
        .chain(std::iter::once(ts.clone()))
        .collect();
        let mut values: Vec<String> = (1..columns.len()).map(|i| d.placeholder(i)).collect();
        values.push(d.timestamp_param(columns.len()));
        let insert = d.insert_ignore(&table_q, &columns, &values);

        let projection = |alias: &str| {
            let prefix = if alias.is_empty() {
                String::new()
            } else {
                format!("{alias}.")
            };
            format!(
                "{p}coin_id, {p}coin_name, {p}price_usd, {p}market_cap, {p}volume_24h, \
                 {p}price_change_percentage_24h, {ts_text} AS {TS_ALIAS}",
                p = prefix,
                ts_text = d.timestamp_text(&format!("{prefix}{ts}")),
            )
        };

        let select_range = format!(
            "SELECT {cols} FROM {table_q} \
             WHERE coin_id = {p1} AND {ts} >= {p2} AND {ts} <= {p3} \
             ORDER BY {ts} ASC",
            cols = projection(""),
            p1 = d.placeholder(1),
            p2 = d.timestamp_param(2),
            p3 = d.timestamp_param(3),
        );

        let delete_before = format!(
            "DELETE FROM {table_q} WHERE {ts} < {p1}",
            p1 = d.timestamp_param(1),
        );

        let select_latest = format!(
            "SELECT {cols} FROM {table_q} p \
             JOIN (SELECT coin_id, MAX({ts}) AS max_ts FROM {table_q} GROUP BY coin_id) m \
             ON p.coin_id = m.coin_id AND p.{ts} = m.max_ts \
             ORDER BY p.market_cap DESC, p.coin_id ASC",
            cols = projection("p"),
        );

        let count_all = format!("SELECT COUNT(*) AS n FROM {table_q}");
        let count_coin = format!(
            "SELECT COUNT(*) AS n FROM {table_q} WHERE coin_id = {p1}",
            p1 = d.placeholder(1),
        );

        Self {
            create_table,
            insert,
            select_range,
            delete_before,
            select_latest,
            count_all,
            count_coin,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{MySqlDialect, PostgresDialect, SqliteDialect};
    use crate::TABLE_NAME;

    #[test]
    fn test_postgres_statements() {
        let q = SeriesQueries::new(&PostgresDialect, TABLE_NAME);
        assert!(q.create_table.contains("\"id\" BIGSERIAL PRIMARY KEY"));
        assert!(q.create_table.contains("\"timestamp\" TIMESTAMP(6) NOT NULL"));
        assert!(q.create_table.contains("UNIQUE (coin_id, \"timestamp\")"));
        assert!(q.insert.contains("$1, $2, $3, $4, $5, $6, CAST($7 AS TIMESTAMP)"));
        assert!(q.insert.ends_with("ON CONFLICT DO NOTHING"));
        assert!(q
            .select_range
            .contains("CAST(\"timestamp\" AS TEXT) AS ts"));
        assert!(q.delete_before.ends_with("< CAST($1 AS TIMESTAMP)"));
    }

    #[test]
    fn test_mysql_statements() {
        let q = SeriesQueries::new(&MySqlDialect, TABLE_NAME);
        assert!(q.create_table.contains("`id` BIGINT AUTO_INCREMENT PRIMARY KEY"));
        assert!(q.create_table.ends_with("ENGINE=InnoDB DEFAULT CHARSET=utf8mb4"));
        assert!(q.insert.starts_with("INSERT IGNORE INTO `crypto_prices`"));
        assert!(q.select_latest.contains("CAST(p.`timestamp` AS CHAR) AS ts"));
    }

    #[test]
    fn test_sqlite_statements() {
        let q = SeriesQueries::new(&SqliteDialect, TABLE_NAME);
        assert!(q.create_table.contains("INTEGER PRIMARY KEY AUTOINCREMENT"));
        assert!(q.insert.starts_with("INSERT OR IGNORE INTO \"crypto_prices\""));
        assert!(q.insert.contains("?, ?, ?, ?, ?, ?, ?"));
        assert!(q.count_coin.ends_with("WHERE coin_id = ?"));
    }
}
