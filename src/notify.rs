//! Notification side channel used by the audit.

use tracing::info;

use crate::error::Result;

/// One message to the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// `None` means the configured default recipient.
    pub recipient: Option<String>,
    pub subject: String,
    pub body: String,
    /// Optional HTML rendition of the body.
    pub html: Option<String>,
}

pub trait Notifier {
    /// # Errors
    /// Delivery failures.
    fn notify(&self, notification: &Notification) -> Result<()>;
}

impl<T: Notifier + ?Sized> Notifier for &T {
    fn notify(&self, notification: &Notification) -> Result<()> {
        (**self).notify(notification)
    }
}

/// Writes notifications to the log instead of delivering them.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier {
    pub default_recipient: Option<String>,
}

impl Notifier for LogNotifier {
    fn notify(&self, notification: &Notification) -> Result<()> {
        let recipient = notification
            .recipient
            .as_deref()
            .or(self.default_recipient.as_deref())
            .unwrap_or("<unset>");
        info!(
            recipient,
            subject = %notification.subject,
            body = %notification.body,
            "Notification"
        );
        Ok(())
    }
}
