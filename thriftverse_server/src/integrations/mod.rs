//! Outbound delivery clients for the notification dispatcher.
//!
//! Both clients are thin reqwest wrappers around third-party HTTP APIs. When the corresponding integration is not
//! configured, the `send` implementations log and report failure; the dispatcher treats that like any other
//! delivery failure and carries on.

mod mailer;
mod push;

pub use mailer::HttpMailer;
pub use push::ExpoPushClient;
