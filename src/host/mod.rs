//! Capability interfaces the pipeline reports and delivers through.

pub mod notify;
pub mod progress;
pub mod sink;

pub use notify::{Notifier, TerminalNotifier};
pub use progress::Spinner;
pub use sink::{MessageFileSink, MessageSink, StdoutSink};
