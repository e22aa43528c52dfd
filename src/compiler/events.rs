//! Change tracking for optimization passes.
//!
//! Every rewrite a pass performs is recorded as an [`Event`] in an
//! [`EventLog`]. The log is the pass pipeline's answer to "what changed,
//! where": it backs the `changed` flag passes return to the scheduler, and it
//! is what callers inspect after optimization.
//!
//! The [`EventLog`] container uses `boxcar::Vec` for lock-free append
//! operations, so workers processing different functions in parallel can all
//! record into the same shared log.
//!
//! # Example
//!
//! ```rust
//! use cfgopt::{compiler::{EventKind, EventLog}, NodeId};
//!
//! let log = EventLog::new();
//! log.record(EventKind::InstructionRemoved)
//!     .at("main", NodeId::new(3))
//!     .message("x = y");
//! log.info("main", "nothing to unroll");
//!
//! assert_eq!(log.len(), 2);
//! assert_eq!(log.count_of(EventKind::InstructionRemoved), 1);
//! ```

use std::fmt;

use strum::{EnumCount, EnumIter, IntoStaticStr};

use crate::utils::graph::NodeId;

/// Category of a recorded event.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumCount, EnumIter, IntoStaticStr, strum::Display,
)]
#[strum(serialize_all = "kebab-case")]
pub enum EventKind {
    /// A dead assignment was spliced out of the graph.
    InstructionRemoved,
    /// A loop was unrolled.
    LoopUnrolled,
    /// A loop was examined but left unchanged.
    LoopSkipped,
    /// Unreachable nodes were swept after a rewrite.
    NodesSwept,
    /// Informational note.
    Info,
    /// Something unexpected that did not stop the pass.
    Warning,
}

/// A single recorded change or note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    /// What happened.
    pub kind: EventKind,
    /// The function the event refers to, if any.
    pub function: Option<String>,
    /// The node the event refers to, if any.
    pub node: Option<NodeId>,
    /// Human readable details.
    pub message: String,
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.kind)?;
        if let Some(function) = &self.function {
            write!(f, " {function}")?;
        }
        if let Some(node) = self.node {
            write!(f, "@{node}")?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        Ok(())
    }
}

/// Builder returned by [`EventLog::record`].
///
/// The event is appended when [`message`](Self::message) is called.
#[must_use = "an event is only recorded once `message` is called"]
pub struct EventBuilder<'a> {
    log: &'a EventLog,
    kind: EventKind,
    function: Option<String>,
    node: Option<NodeId>,
}

impl EventBuilder<'_> {
    /// Attaches the function and node the event refers to.
    pub fn at(mut self, function: impl Into<String>, node: NodeId) -> Self {
        self.function = Some(function.into());
        self.node = Some(node);
        self
    }

    /// Attaches only the function the event refers to.
    pub fn function(mut self, function: impl Into<String>) -> Self {
        self.function = Some(function.into());
        self
    }

    /// Sets the message and appends the event to the log.
    pub fn message(self, message: impl Into<String>) {
        self.log.push(Event {
            kind: self.kind,
            function: self.function,
            node: self.node,
            message: message.into(),
        });
    }
}

/// Thread-safe, append-only collection of [`Event`]s.
#[derive(Debug)]
pub struct EventLog {
    events: boxcar::Vec<Event>,
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}

impl EventLog {
    /// Creates a new empty log.
    #[must_use]
    pub fn new() -> Self {
        Self {
            events: boxcar::Vec::new(),
        }
    }

    /// Starts recording an event of the given kind.
    pub fn record(&self, kind: EventKind) -> EventBuilder<'_> {
        EventBuilder {
            log: self,
            kind,
            function: None,
            node: None,
        }
    }

    /// Records an informational note about `function`.
    pub fn info(&self, function: impl Into<String>, message: impl Into<String>) {
        self.record(EventKind::Info).function(function).message(message);
    }

    /// Records a warning about `function`.
    pub fn warn(&self, function: impl Into<String>, message: impl Into<String>) {
        self.record(EventKind::Warning)
            .function(function)
            .message(message);
    }

    /// Appends an event directly.
    pub fn push(&self, event: Event) {
        self.events.push(event);
    }

    /// Appends every event of `other`, preserving its order.
    pub fn merge(&self, other: EventLog) {
        for event in other.iter() {
            self.events.push(event.clone());
        }
    }

    /// Moves every event out of this log, leaving it empty.
    pub fn take(&mut self) -> EventLog {
        std::mem::take(self)
    }

    /// Returns the number of recorded events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.count()
    }

    /// Returns `true` if nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.count() == 0
    }

    /// Iterates over the events in recording order.
    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.events.iter().map(|(_, e)| e)
    }

    /// Returns the number of events of the given kind.
    #[must_use]
    pub fn count_of(&self, kind: EventKind) -> usize {
        self.iter().filter(|e| e.kind == kind).count()
    }

    /// Returns the events recorded for `function`.
    #[must_use]
    pub fn for_function(&self, function: &str) -> Vec<&Event> {
        self.iter()
            .filter(|e| e.function.as_deref() == Some(function))
            .collect()
    }
}

impl fmt::Display for EventLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for event in self.iter() {
            writeln!(f, "{event}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, thread};

    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn test_builder_records_context() {
        let log = EventLog::new();
        log.record(EventKind::LoopUnrolled)
            .at("sum", NodeId::new(4))
            .message("factor 5");

        let event = log.iter().next().unwrap();
        assert_eq!(event.kind, EventKind::LoopUnrolled);
        assert_eq!(event.function.as_deref(), Some("sum"));
        assert_eq!(event.node, Some(NodeId::new(4)));
        assert_eq!(event.to_string(), "[loop-unrolled] sum@n4: factor 5");
    }

    #[test]
    fn test_merge_and_take() {
        let mut log = EventLog::new();
        let local = EventLog::new();
        local.warn("f", "odd");
        local.info("f", "fine");
        log.merge(local);
        assert_eq!(log.len(), 2);
        assert_eq!(log.for_function("f").len(), 2);

        let taken = log.take();
        assert!(log.is_empty());
        assert_eq!(taken.count_of(EventKind::Warning), 1);
    }

    #[test]
    fn test_concurrent_recording() {
        let log = Arc::new(EventLog::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let log = Arc::clone(&log);
                thread::spawn(move || log.info(format!("f{i}"), "done"))
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(log.count_of(EventKind::Info), 8);
    }

    #[test]
    fn test_kind_names() {
        let names: Vec<&'static str> = EventKind::iter().map(Into::into).collect();
        assert_eq!(names.len(), EventKind::COUNT);
        assert_eq!(EventKind::NodesSwept.to_string(), "nodes-swept");
    }
}
