//! SQLite schema definition.

/// Complete database schema for the notification store.
pub const SCHEMA: &str = r#"
-- ============================================================================
-- eGFR Drop Notifications (one per subject visit)
-- ============================================================================

CREATE TABLE IF NOT EXISTS egfr_drop_notifications (
    id TEXT PRIMARY KEY,
    subject_visit_id TEXT NOT NULL UNIQUE,
    report_datetime TEXT NOT NULL,               -- RFC 3339, UTC
    creatinine_date TEXT NOT NULL,               -- YYYY-MM-DD, UTC
    egfr_percent_change REAL NOT NULL,
    report_status TEXT NOT NULL DEFAULT 'new'
        CHECK (report_status IN ('new', 'open', 'closed')),
    consent_version TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_egfr_drop_status ON egfr_drop_notifications(report_status);
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_schema_valid() {
        let conn = Connection::open_in_memory().unwrap();
        let result = conn.execute_batch(SCHEMA);
        assert!(result.is_ok(), "Schema should be valid SQL: {:?}", result);
    }

    #[test]
    fn test_one_notification_per_visit() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA).unwrap();

        let insert = "INSERT INTO egfr_drop_notifications (
                id, subject_visit_id, report_datetime, creatinine_date,
                egfr_percent_change, consent_version
            ) VALUES (?1, 'visit-1', '2024-01-01T00:00:00Z', '2024-01-01', 25.0, '1')";

        assert!(conn.execute(insert, ["a"]).is_ok());
        assert!(conn.execute(insert, ["b"]).is_err());
    }

    #[test]
    fn test_status_constraint() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA).unwrap();

        let result = conn.execute(
            "INSERT INTO egfr_drop_notifications (
                id, subject_visit_id, report_datetime, creatinine_date,
                egfr_percent_change, report_status, consent_version
            ) VALUES ('a', 'visit-1', '2024-01-01T00:00:00Z', '2024-01-01', 25.0, 'pending', '1')",
            [],
        );
        assert!(result.is_err());
    }
}
