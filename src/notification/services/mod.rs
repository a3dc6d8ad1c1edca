//! Notification services.

mod fanout;

pub use fanout::{
    NotificationError, NotificationFanout, NotificationReceipt, NotificationRequest,
    NotificationResult,
};
