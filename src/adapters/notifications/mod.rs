//! Billing notification adapters.
//!
//! - [`SlackNotifier`] posts lifecycle notices to an incoming webhook
//! - [`RecordingNotifier`] keeps notices in memory for tests

mod recording_notifier;
mod slack_notifier;

pub use recording_notifier::RecordingNotifier;
pub use slack_notifier::SlackNotifier;
