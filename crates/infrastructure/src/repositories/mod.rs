pub mod connection_log_repository;
pub mod dns_log_repository;

pub use connection_log_repository::SqliteConnectionLogRepository;
pub use dns_log_repository::SqliteDnsLogRepository;

/// Rows per multi-row INSERT, well below SQLite's bound-parameter limit.
const MAX_ROWS_PER_STATEMENT: usize = 500;

fn multi_row_insert(table: &str, columns: &[&str], rows: usize) -> String {
    let placeholders = format!("({})", vec!["?"; columns.len()].join(", "));
    let mut sql = format!("INSERT INTO {table} ({}) VALUES ", columns.join(", "));
    for i in 0..rows {
        if i > 0 {
            sql.push_str(", ");
        }
        sql.push_str(&placeholders);
    }
    sql
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multi_row_insert_sql() {
        let sql = multi_row_insert("t", &["a", "b"], 3);
        assert_eq!(sql, "INSERT INTO t (a, b) VALUES (?, ?), (?, ?), (?, ?)");
    }
}
