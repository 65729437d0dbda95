//! Tracing integration for the TUI.
//!
//! Provides a custom tracing layer that captures log events and sends them
//! to the TUI's log buffer via a channel.

use std::fmt::Write as FmtWrite;
use tokio::sync::mpsc;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;

/// One formatted log line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    pub level: Level,
    pub text: String,
}

/// A tracing layer that sends formatted log lines to a channel.
pub struct TuiLogLayer {
    tx: mpsc::Sender<LogLine>,
}

impl TuiLogLayer {
    /// Create a new TUI log layer.
    pub fn new(tx: mpsc::Sender<LogLine>) -> Self {
        Self { tx }
    }
}

impl<S> Layer<S> for TuiLogLayer
where
    S: Subscriber,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut text = String::new();

        let now = chrono::Local::now();
        let _ = write!(text, "{} ", now.format("%H:%M:%S"));

        let level = *event.metadata().level();
        let _ = write!(text, "[{:5}] ", level);

        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        text.push_str(&visitor.message);

        // Dropped when the buffer is full
        let _ = self.tx.try_send(LogLine { level, text });
    }
}

/// Visitor for extracting the message from a tracing event.
#[derive(Default)]
struct MessageVisitor {
    message: String,
}

impl MessageVisitor {
    fn push_field(&mut self, name: &str, value: impl std::fmt::Display) {
        if !self.message.is_empty() {
            self.message.push(' ');
        }
        let _ = write!(self.message, "{}={}", name, value);
    }
}

impl tracing::field::Visit for MessageVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.message, "{:?}", value);
        } else {
            self.push_field(field.name(), format!("{:?}", value));
        }
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.message.push_str(value);
        } else {
            self.push_field(field.name(), value);
        }
    }

    fn record_i64(&mut self, field: &tracing::field::Field, value: i64) {
        self.push_field(field.name(), value);
    }

    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.push_field(field.name(), value);
    }

    fn record_bool(&mut self, field: &tracing::field::Field, value: bool) {
        self.push_field(field.name(), value);
    }
}
