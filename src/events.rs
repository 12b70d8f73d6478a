//! Message channel between the organizing core and whatever presents it.
//!
//! The scanner, organizer and undo engine never print or log on their own.
//! They hand [`Event`]s to an [`EventSink`] supplied by the caller, which
//! decides whether a message ends up on the console, in the log file, or in
//! a test assertion.

use std::fmt;

/// How serious an event is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Debug,
    Info,
    Warning,
    Error,
}

/// The part of a run that produced an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Scan,
    Organize,
    Move,
    History,
    Undo,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Scan => "scan",
            Stage::Organize => "organize",
            Stage::Move => "move",
            Stage::History => "history",
            Stage::Undo => "undo",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single progress or diagnostic message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub stage: Stage,
    pub severity: Severity,
    pub message: String,
}

/// Receiver for events emitted during organize and undo runs.
pub trait EventSink {
    /// Receives one event.
    fn emit(&mut self, event: Event);

    /// Called once per processed file with the number done so far and the total.
    fn progress(&mut self, _done: usize, _total: usize) {}

    fn debug(&mut self, stage: Stage, message: String) {
        self.emit(Event {
            stage,
            severity: Severity::Debug,
            message,
        });
    }

    fn info(&mut self, stage: Stage, message: String) {
        self.emit(Event {
            stage,
            severity: Severity::Info,
            message,
        });
    }

    fn warning(&mut self, stage: Stage, message: String) {
        self.emit(Event {
            stage,
            severity: Severity::Warning,
            message,
        });
    }

    fn error(&mut self, stage: Stage, message: String) {
        self.emit(Event {
            stage,
            severity: Severity::Error,
            message,
        });
    }
}

/// Forwards every event to `tracing` with the stage as a structured field.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&mut self, event: Event) {
        let stage = event.stage.as_str();
        match event.severity {
            Severity::Debug => tracing::debug!(stage, "{}", event.message),
            Severity::Info => tracing::info!(stage, "{}", event.message),
            Severity::Warning => tracing::warn!(stage, "{}", event.message),
            Severity::Error => tracing::error!(stage, "{}", event.message),
        }
    }
}

/// Keeps every event in memory.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    pub events: Vec<Event>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events at exactly the given severity.
    pub fn with_severity(&self, severity: Severity) -> impl Iterator<Item = &Event> {
        self.events.iter().filter(move |e| e.severity == severity)
    }

    /// True if any event message contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.events.iter().any(|e| e.message.contains(needle))
    }
}

impl EventSink for MemorySink {
    fn emit(&mut self, event: Event) {
        self.events.push(event);
    }
}
