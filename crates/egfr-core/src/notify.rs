//! eGFR drop notifications.
//!
//! The engine decides whether a drop warrants a notification; where it is
//! stored is up to a [`DropNotificationStore`]. The create-or-update runs in a
//! single store transaction so two evaluations of the same visit cannot both
//! take the create path.

use thiserror::Error;

use crate::models::{CallingContext, EgfrDropNotification};

/// Notification store errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NotificationError {
    #[error("Notification store error: {0}")]
    Store(String),

    #[error("Notification for visit {0} missing after write")]
    MissingAfterWrite(String),
}

pub type NotificationResult<T> = Result<T, NotificationError>;

/// A unit of work against the notification store.
///
/// Dropping it without calling [`DropNotificationTransaction::commit`]
/// discards every write made through it.
pub trait DropNotificationTransaction {
    fn get_or_none(&self, subject_visit_id: &str) -> NotificationResult<Option<EgfrDropNotification>>;

    fn create(&self, notification: &EgfrDropNotification) -> NotificationResult<()>;

    fn update(&self, notification: &EgfrDropNotification) -> NotificationResult<()>;

    fn commit(self: Box<Self>) -> NotificationResult<()>;
}

/// Persistent home of drop notifications, one per subject visit.
pub trait DropNotificationStore {
    /// Start a transaction that holds the write lock until commit.
    fn begin(&self) -> NotificationResult<Box<dyn DropNotificationTransaction + '_>>;

    /// Read the stored notification for a visit outside any transaction.
    fn get_drop_notification(&self, subject_visit_id: &str) -> NotificationResult<Option<EgfrDropNotification>>;
}

/// Create the visit's notification, or update the drop and creatinine date of
/// the existing one. Returns the record as re-read from the store.
pub fn create_or_update_drop_notification(
    store: &dyn DropNotificationStore,
    context: &CallingContext,
    egfr_percent_change: f64,
) -> NotificationResult<EgfrDropNotification> {
    let tx = store.begin()?;
    match tx.get_or_none(&context.subject_visit_id)? {
        Some(mut existing) => {
            existing.apply_reevaluation(context, egfr_percent_change);
            tx.update(&existing)?;
            tracing::info!(
                subject_visit_id = %context.subject_visit_id,
                egfr_percent_change,
                "updated egfr drop notification"
            );
        }
        None => {
            tx.create(&EgfrDropNotification::new(context, egfr_percent_change))?;
            tracing::info!(
                subject_visit_id = %context.subject_visit_id,
                egfr_percent_change,
                "created egfr drop notification"
            );
        }
    }
    tx.commit()?;

    store
        .get_drop_notification(&context.subject_visit_id)?
        .ok_or_else(|| NotificationError::MissingAfterWrite(context.subject_visit_id.clone()))
}
