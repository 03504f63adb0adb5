//! User-facing notifications for API outcomes.
//!
//! The HTTP client maps every failed request to a [`Notification`] and hands
//! it to a [`Notifier`]. Front ends decide how to show it; the default just
//! logs.

use std::fmt;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub description: String,
    pub severity: Severity,
}

impl Notification {
    pub fn info(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            severity: Severity::Info,
        }
    }

    pub fn error(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            severity: Severity::Error,
        }
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.title, self.description)
    }
}

/// Notification for a response with an error status.
///
/// `server_message` is the `message` field of the response body, when there
/// was one. It replaces the stock description for statuses where the server
/// usually has something specific to say.
pub fn notification_for_status(status: u16, server_message: Option<&str>) -> Notification {
    let message = server_message.filter(|m| !m.is_empty());
    match status {
        400 => Notification::error(
            "Bad Request",
            message.unwrap_or("Invalid request data"),
        ),
        401 => Notification::error("Unauthorized", "Please log in to continue"),
        403 => Notification::error(
            "Forbidden",
            "You don't have permission to perform this action",
        ),
        404 => Notification::error(
            "Not Found",
            message.unwrap_or("The requested resource was not found"),
        ),
        422 => Notification::error(
            "Validation Error",
            message.unwrap_or("Please check your input data"),
        ),
        429 => Notification::error("Too Many Requests", "Please slow down and try again later"),
        500 => Notification::error(
            "Server Error",
            "Something went wrong on our end. Please try again later",
        ),
        _ => Notification::error(
            "Error",
            message
                .map(str::to_string)
                .unwrap_or_else(|| format!("Request failed with status {status}")),
        ),
    }
}

/// Notification for a request that never got a response.
pub fn network_error() -> Notification {
    Notification::error(
        "Network Error",
        "Unable to connect to the server. Please check your internet connection",
    )
}

/// Notification for any other failure.
pub fn unexpected_error(message: Option<&str>) -> Notification {
    Notification::error(
        "Unexpected Error",
        message.unwrap_or("An unexpected error occurred"),
    )
}

/// Receives notifications from the API client.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

impl<T: Notifier + ?Sized> Notifier for Arc<T> {
    fn notify(&self, notification: Notification) {
        (**self).notify(notification)
    }
}

/// Logs notifications through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notification: Notification) {
        match notification.severity {
            Severity::Info => tracing::info!(
                title = %notification.title,
                "{}", notification.description
            ),
            Severity::Error => tracing::warn!(
                title = %notification.title,
                "{}", notification.description
            ),
        }
    }
}

/// Keeps notifications in memory, for front ends that drain them later.
#[derive(Debug, Clone, Default)]
pub struct CollectingNotifier {
    seen: Arc<Mutex<Vec<Notification>>>,
}

impl CollectingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take everything collected so far.
    pub fn drain(&self) -> Vec<Notification> {
        match self.seen.lock() {
            Ok(mut seen) => std::mem::take(&mut *seen),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }
}

impl Notifier for CollectingNotifier {
    fn notify(&self, notification: Notification) {
        match self.seen.lock() {
            Ok(mut seen) => seen.push(notification),
            Err(poisoned) => poisoned.into_inner().push(notification),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_titles() {
        let titles: Vec<_> = [400, 401, 403, 404, 422, 429, 500, 418]
            .into_iter()
            .map(|s| notification_for_status(s, None).title)
            .collect();
        insta::assert_yaml_snapshot!(titles, @r###"
        - Bad Request
        - Unauthorized
        - Forbidden
        - Not Found
        - Validation Error
        - Too Many Requests
        - Server Error
        - Error
        "###);
    }

    #[test]
    fn test_server_message_overrides_some_statuses() {
        let n = notification_for_status(422, Some("title is required"));
        assert_eq!(n.description, "title is required");
        assert_eq!(n.severity, Severity::Error);

        let n = notification_for_status(403, Some("nope"));
        assert_eq!(n.description, "You don't have permission to perform this action");

        let n = notification_for_status(503, None);
        assert_eq!(n.description, "Request failed with status 503");

        let n = notification_for_status(400, Some(""));
        assert_eq!(n.description, "Invalid request data");
    }

    #[test]
    fn test_collecting_notifier_drains() {
        let notifier = CollectingNotifier::new();
        notifier.notify(network_error());
        notifier.notify(Notification::info("Success", "Saved"));
        let drained = notifier.drain();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].title, "Network Error");
        assert!(notifier.drain().is_empty());
    }
}
