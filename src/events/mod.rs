//! # Events Module
//!
//! Event-driven progress reporting for any consumer (CLI, GUI, tests).
//!
//! ## Design
//! Background tasks never touch item state. They stream events through a
//! channel; the foreground applies decoded thumbnails and detection results
//! and re-publishes selection changes as [`SelectionEvent`]s.
//!
//! ## Example
//! ```rust,ignore
//! let (sender, receiver) = EventChannel::new();
//! let orchestrator = TaskOrchestrator::new(sender);
//! orchestrator.dispatch(TaskRequest::LoadFolder { folder })?;
//!
//! for event in receiver.iter() {
//!     match event {
//!         Event::Log(line) => println!("{}", line.message),
//!         Event::Task(TaskEvent::Completed { .. }) => break,
//!         _ => {}
//!     }
//! }
//! ```

mod channel;
mod types;

pub use channel::{null_sender, EventChannel, EventReceiver, EventSender};
pub use types::*;
