//! Run events and completion notification.
//!
//! ```text
//!   training loop ──RunEvent──► crossbeam channel ──► watcher / control plane
//!        │
//!        └── cleanup ──► CompletionNotifier (channel or HTTP callback)
//! ```

mod notifier;
mod run_msg;

#[cfg(test)]
mod tests;

pub use notifier::{ChannelNotifier, CompletionNotifier, HttpNotifier, NotifyError};
pub use run_msg::{FinishReason, RunEvent};
