//! Outbound commands and subscriptions.
//!
//! A command pairs a target endpoint and payload with a response converter
//! and a listener. The session only sees commands through the object-safe
//! [`ServiceCommand`] trait, so commands with different result types share
//! one pending request table.
//!
//! | Type | Kind | Lifetime in table |
//! |------|------|-------------------|
//! | [`Command`] | `request` | Until first response or error |
//! | [`Subscription`] | `subscribe` | Until unsubscribed or socket close |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use tracing::warn;

use crate::error::{Error, Result};
use crate::protocol::RequestKind;

// ============================================================================
// Types
// ============================================================================

/// Callback receiving the converted result of a request.
pub type ResponseListener<X> = Arc<dyn Fn(Result<X>) + Send + Sync>;

/// Converts a raw response payload into a typed result.
pub type Converter<X> = Box<dyn Fn(&Value) -> Result<X> + Send + Sync>;

/// Wraps a closure as a [`ResponseListener`].
///
/// # Example
///
/// ```ignore
/// tv.get_mute(listener(|muted| println!("{muted:?}")));
/// ```
#[inline]
pub fn listener<X, F>(f: F) -> ResponseListener<X>
where
    F: Fn(Result<X>) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// A listener that discards results.
#[must_use]
pub fn ignore<X: 'static>() -> ResponseListener<X> {
    Arc::new(|_| {})
}

/// Converter returning the raw payload unchanged.
#[must_use]
pub fn raw_payload() -> Converter<Value> {
    Box::new(|payload| Ok(payload.clone()))
}

// ============================================================================
// ServiceCommand
// ============================================================================

/// Type-erased view of a command held by the session.
pub trait ServiceCommand: Send + Sync {
    /// Target endpoint URI (e.g. `ssap://audio/getVolume`).
    fn target(&self) -> &str;

    /// Payload sent with the request.
    fn payload(&self) -> Option<&Value>;

    /// Whether this is a one-shot request or a subscription.
    fn kind(&self) -> RequestKind;

    /// Returns `true` if the entry stays registered after a response.
    fn is_subscription(&self) -> bool {
        self.kind() == RequestKind::Subscribe
    }

    /// Converts `payload` and delivers it to the listener(s).
    fn process_response(&self, payload: &Value);

    /// Delivers a device error string to the listener(s).
    fn process_error(&self, message: &str);
}

/// Logs a converter failure and normalizes it into a payload error message.
fn conversion_failure(target: &str, error: &Error) -> String {
    warn!(target_uri = target, error = %error, "Failed to convert response payload");
    match error {
        Error::Payload { message } => message.clone(),
        other => other.to_string(),
    }
}

// ============================================================================
// Command
// ============================================================================

/// A one-shot `request`.
pub struct Command<X> {
    target: String,
    payload: Option<Value>,
    converter: Converter<X>,
    listener: ResponseListener<X>,
}

impl<X> Command<X> {
    /// Creates a command.
    pub fn new(
        target: impl Into<String>,
        payload: Option<Value>,
        converter: Converter<X>,
        listener: ResponseListener<X>,
    ) -> Self {
        Self {
            target: target.into(),
            payload,
            converter,
            listener,
        }
    }
}

impl<X> fmt::Debug for Command<X> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("target", &self.target)
            .field("payload", &self.payload)
            .finish_non_exhaustive()
    }
}

impl<X> ServiceCommand for Command<X> {
    fn target(&self) -> &str {
        &self.target
    }

    fn payload(&self) -> Option<&Value> {
        self.payload.as_ref()
    }

    fn kind(&self) -> RequestKind {
        RequestKind::Request
    }

    fn process_response(&self, payload: &Value) {
        let result = (self.converter)(payload)
            .map_err(|e| Error::payload(conversion_failure(&self.target, &e)));
        (self.listener)(result);
    }

    fn process_error(&self, message: &str) {
        (self.listener)(Err(Error::device(message)));
    }
}

// ============================================================================
// Subscription
// ============================================================================

/// A persistent `subscribe` delivering every notification to its listeners.
///
/// Returned by subscribing capability methods; pass it to
/// [`Session::unsubscribe`](crate::Session::unsubscribe) to cancel.
pub struct Subscription<X> {
    target: String,
    payload: Option<Value>,
    converter: Converter<X>,
    listeners: Mutex<Vec<ResponseListener<X>>>,
}

impl<X: Clone> Subscription<X> {
    /// Creates a subscription with one initial listener.
    pub fn new(
        target: impl Into<String>,
        payload: Option<Value>,
        converter: Converter<X>,
        listener: ResponseListener<X>,
    ) -> Self {
        Self {
            target: target.into(),
            payload,
            converter,
            listeners: Mutex::new(vec![listener]),
        }
    }

    /// Adds a listener that receives subsequent notifications.
    pub fn add_listener(&self, listener: ResponseListener<X>) {
        self.listeners.lock().push(listener);
    }

    /// Returns the number of registered listeners.
    #[inline]
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }

    fn snapshot(&self) -> Vec<ResponseListener<X>> {
        self.listeners.lock().clone()
    }
}

impl<X> fmt::Debug for Subscription<X> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("target", &self.target)
            .field("payload", &self.payload)
            .finish_non_exhaustive()
    }
}

impl<X: Clone + Send + Sync> ServiceCommand for Subscription<X> {
    fn target(&self) -> &str {
        &self.target
    }

    fn payload(&self) -> Option<&Value> {
        self.payload.as_ref()
    }

    fn kind(&self) -> RequestKind {
        RequestKind::Subscribe
    }

    fn process_response(&self, payload: &Value) {
        match (self.converter)(payload) {
            Ok(value) => {
                for listener in self.snapshot() {
                    listener(Ok(value.clone()));
                }
            }
            Err(e) => {
                let message = conversion_failure(&self.target, &e);
                for listener in self.snapshot() {
                    listener(Err(Error::payload(message.clone())));
                }
            }
        }
    }

    fn process_error(&self, message: &str) {
        for listener in self.snapshot() {
            listener(Err(Error::device(message)));
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn volume_converter() -> Converter<i64> {
        Box::new(|payload| {
            payload
                .get("volume")
                .and_then(Value::as_i64)
                .ok_or_else(|| Error::payload("missing field 'volume'"))
        })
    }

    #[test]
    fn test_command_delivers_converted_value() {
        let seen = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&seen);
        let command = Command::new(
            "ssap://audio/getVolume",
            None,
            volume_converter(),
            listener(move |r: Result<i64>| *sink.lock() = Some(r.ok())),
        );

        command.process_response(&json!({"volume": 14}));

        assert_eq!(*seen.lock(), Some(Some(14)));
        assert!(!command.is_subscription());
        assert_eq!(command.target(), "ssap://audio/getVolume");
    }

    #[test]
    fn test_command_converter_failure_is_payload_error() {
        let seen = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&seen);
        let command = Command::new(
            "ssap://audio/getVolume",
            None,
            volume_converter(),
            listener(move |r: Result<i64>| *sink.lock() = Some(r)),
        );

        command.process_response(&json!({"muted": true}));

        let result = seen.lock().take().expect("listener called");
        match result {
            Err(Error::Payload { message }) => assert_eq!(message, "missing field 'volume'"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_command_error_is_device_error() {
        let seen = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&seen);
        let command = Command::new(
            "ssap://system/turnOff",
            None,
            raw_payload(),
            listener(move |r: Result<Value>| *sink.lock() = Some(r)),
        );

        command.process_error("401 insufficient permissions");

        let result = seen.lock().take().expect("listener called");
        assert!(matches!(result, Err(Error::Device { message }) if message == "401 insufficient permissions"));
    }

    #[test]
    fn test_subscription_fans_out_to_all_listeners() {
        let hits = Arc::new(AtomicUsize::new(0));
        let first = Arc::clone(&hits);
        let second = Arc::clone(&hits);

        let subscription = Subscription::new(
            "ssap://audio/getVolume",
            None,
            volume_converter(),
            listener(move |r: Result<i64>| {
                assert_eq!(r.ok(), Some(3));
                first.fetch_add(1, Ordering::SeqCst);
            }),
        );
        subscription.add_listener(listener(move |r: Result<i64>| {
            assert_eq!(r.ok(), Some(3));
            second.fetch_add(1, Ordering::SeqCst);
        }));

        subscription.process_response(&json!({"volume": 3}));

        assert!(subscription.is_subscription());
        assert_eq!(subscription.listener_count(), 2);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_subscription_error_reaches_every_listener() {
        let errors = Arc::new(AtomicUsize::new(0));
        let a = Arc::clone(&errors);
        let b = Arc::clone(&errors);

        let subscription = Subscription::new(
            "ssap://tv/getCurrentChannel",
            None,
            raw_payload(),
            listener(move |r: Result<Value>| {
                if r.is_err() {
                    a.fetch_add(1, Ordering::SeqCst);
                }
            }),
        );
        subscription.add_listener(listener(move |r: Result<Value>| {
            if r.is_err() {
                b.fetch_add(1, Ordering::SeqCst);
            }
        }));

        subscription.process_error("500 application error");
        assert_eq!(errors.load(Ordering::SeqCst), 2);
    }
}
