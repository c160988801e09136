//! # Notification Bus
//!
//! In-process publish/subscribe used for cross-component signaling inside a
//! workflow. Subscribers register interest in a topic and receive every
//! notification published on it afterwards, synchronously and in registration
//! order. Subjects keep no subscriber lists of their own: the bus is the only
//! registry, and a [`SubscriptionHandle`] is the only link back to it.
//!
//! ```rust
//! use flowstate_core::events::{NotificationBus, Notification, HandlerError};
//! use std::sync::Arc;
//!
//! let bus = NotificationBus::new();
//! let handle = bus.subscribe_fn("order.received", |n: &Notification| -> Result<(), HandlerError> {
//!     assert_eq!(n.payload["key"], "value");
//!     Ok(())
//! });
//!
//! let report = bus.publish("order.received", serde_json::json!({"key": "value"}));
//! assert_eq!(report.delivered, 1);
//! bus.unsubscribe(&handle);
//! ```

pub mod bus;
pub mod types;

pub use bus::{BusStats, NotificationBus};
pub use types::{
    FaultSink, HandlerError, HandlerFailure, LoggingFaultSink, Notification, NotificationHandler,
    PublishReport, SubscriptionHandle,
};
