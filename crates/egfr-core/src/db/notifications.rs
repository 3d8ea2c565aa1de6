//! eGFR drop notification database operations.

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};

use super::{Database, DbError, DbResult};
use crate::models::{EgfrDropNotification, ReportStatus};
use crate::notify::{DropNotificationStore, DropNotificationTransaction, NotificationResult};

const SELECT_COLUMNS: &str = r#"
    SELECT id, subject_visit_id, report_datetime, creatinine_date,
           egfr_percent_change, report_status, consent_version,
           created_at, updated_at
    FROM egfr_drop_notifications
"#;

impl Database {
    /// Get the notification for a subject visit.
    pub fn get_drop_notification_for_visit(
        &self,
        subject_visit_id: &str,
    ) -> DbResult<Option<EgfrDropNotification>> {
        select_by_visit(&self.conn, subject_visit_id)
    }

    /// List all notifications, newest first.
    pub fn list_drop_notifications(&self) -> DbResult<Vec<EgfrDropNotification>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{} ORDER BY created_at DESC, subject_visit_id", SELECT_COLUMNS))?;
        let rows = stmt.query_map([], map_row)?;

        let mut notifications = Vec::new();
        for row in rows {
            notifications.push(row?.try_into()?);
        }
        Ok(notifications)
    }

    /// Delete the notification for a subject visit.
    pub fn delete_drop_notification(&self, subject_visit_id: &str) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            "DELETE FROM egfr_drop_notifications WHERE subject_visit_id = ?",
            [subject_visit_id],
        )?;
        Ok(rows_affected > 0)
    }
}

impl DropNotificationStore for Database {
    fn begin(&self) -> NotificationResult<Box<dyn DropNotificationTransaction + '_>> {
        // IMMEDIATE takes the write lock up front so the read that decides
        // between create and update cannot race another writer.
        let tx = Transaction::new_unchecked(&self.conn, TransactionBehavior::Immediate)
            .map_err(DbError::from)?;
        Ok(Box::new(SqliteNotificationTransaction { tx }))
    }

    fn get_drop_notification(
        &self,
        subject_visit_id: &str,
    ) -> NotificationResult<Option<EgfrDropNotification>> {
        Ok(self.get_drop_notification_for_visit(subject_visit_id)?)
    }
}

/// Notification writes inside one SQLite transaction.
pub struct SqliteNotificationTransaction<'c> {
    tx: Transaction<'c>,
}

impl DropNotificationTransaction for SqliteNotificationTransaction<'_> {
    fn get_or_none(&self, subject_visit_id: &str) -> NotificationResult<Option<EgfrDropNotification>> {
        Ok(select_by_visit(&self.tx, subject_visit_id)?)
    }

    fn create(&self, notification: &EgfrDropNotification) -> NotificationResult<()> {
        self.tx
            .execute(
                r#"
                INSERT INTO egfr_drop_notifications (
                    id, subject_visit_id, report_datetime, creatinine_date,
                    egfr_percent_change, report_status, consent_version,
                    created_at, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                "#,
                params![
                    notification.id,
                    notification.subject_visit_id,
                    notification.report_datetime.to_rfc3339(),
                    notification.creatinine_date.to_string(),
                    notification.egfr_percent_change,
                    notification.report_status.as_str(),
                    notification.consent_version,
                    notification.created_at,
                    notification.updated_at,
                ],
            )
            .map_err(DbError::from)?;
        Ok(())
    }

    fn update(&self, notification: &EgfrDropNotification) -> NotificationResult<()> {
        let rows_affected = self
            .tx
            .execute(
                r#"
                UPDATE egfr_drop_notifications SET
                    egfr_percent_change = ?2,
                    creatinine_date = ?3,
                    updated_at = ?4
                WHERE subject_visit_id = ?1
                "#,
                params![
                    notification.subject_visit_id,
                    notification.egfr_percent_change,
                    notification.creatinine_date.to_string(),
                    notification.updated_at,
                ],
            )
            .map_err(DbError::from)?;
        if rows_affected == 0 {
            return Err(DbError::NotFound(notification.subject_visit_id.clone()).into());
        }
        Ok(())
    }

    fn commit(self: Box<Self>) -> NotificationResult<()> {
        self.tx.commit().map_err(DbError::from)?;
        Ok(())
    }
}

fn select_by_visit(conn: &Connection, subject_visit_id: &str) -> DbResult<Option<EgfrDropNotification>> {
    conn.query_row(
        &format!("{} WHERE subject_visit_id = ?", SELECT_COLUMNS),
        [subject_visit_id],
        map_row,
    )
    .optional()?
    .map(|row| row.try_into())
    .transpose()
}

fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<NotificationRow> {
    Ok(NotificationRow {
        id: row.get(0)?,
        subject_visit_id: row.get(1)?,
        report_datetime: row.get(2)?,
        creatinine_date: row.get(3)?,
        egfr_percent_change: row.get(4)?,
        report_status: row.get(5)?,
        consent_version: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

/// Intermediate row struct for database mapping.
struct NotificationRow {
    id: String,
    subject_visit_id: String,
    report_datetime: String,
    creatinine_date: String,
    egfr_percent_change: f64,
    report_status: String,
    consent_version: String,
    created_at: String,
    updated_at: String,
}

impl TryFrom<NotificationRow> for EgfrDropNotification {
    type Error = DbError;

    fn try_from(row: NotificationRow) -> Result<Self, Self::Error> {
        let report_datetime = DateTime::parse_from_rfc3339(&row.report_datetime)
            .map_err(|e| DbError::Constraint(format!("Bad report_datetime {}: {}", row.report_datetime, e)))?
            .with_timezone(&Utc);
        let creatinine_date = NaiveDate::parse_from_str(&row.creatinine_date, "%Y-%m-%d")
            .map_err(|e| DbError::Constraint(format!("Bad creatinine_date {}: {}", row.creatinine_date, e)))?;
        let report_status = row
            .report_status
            .parse::<ReportStatus>()
            .map_err(|e| DbError::Constraint(format!("{}", e)))?;

        Ok(EgfrDropNotification {
            id: row.id,
            subject_visit_id: row.subject_visit_id,
            report_datetime,
            creatinine_date,
            egfr_percent_change: row.egfr_percent_change,
            report_status,
            consent_version: row.consent_version,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
