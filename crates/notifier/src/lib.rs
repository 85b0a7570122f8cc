//! Notification delivery: the single-consumer queue and the desktop dispatcher
//! that drains it.

pub mod desktop;
pub mod dispatcher;
pub mod queue;

pub use desktop::DesktopSink;
pub use dispatcher::{DesktopDispatcher, Dispatcher};
pub use queue::{NotificationSender, QueueConsumer, notification_queue};
