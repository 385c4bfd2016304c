//! Lifecycle audit hooks for the core loop.
//!
//! Records carry a stage plus structured details so callers can buffer or
//! visualise node churn and cascade aborts without touching the loop itself.

use std::sync::Mutex;
use std::time::SystemTime;

use serde_json::Value;

/// Checkpoints emitted by [`Core`](super::Core).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoreAuditStage {
    ContextCreated,
    SubcontextCreated,
    ContextDestroyed,
    SubcontextDestroyed,
    /// A cascade stopped early because the stack changed or exit was requested.
    CascadeAborted,
    FrameFlushed,
    HotkeyTriggered,
    RunStarted,
    RunStopped,
}

#[derive(Debug, Clone)]
pub struct CoreAuditEvent {
    pub timestamp: SystemTime,
    pub stage: CoreAuditStage,
    pub details: Vec<(String, Value)>,
}

impl CoreAuditEvent {
    fn new(stage: CoreAuditStage) -> Self {
        Self {
            timestamp: SystemTime::now(),
            stage,
            details: Vec::new(),
        }
    }

    pub fn detail(&self, key: &str) -> Option<&Value> {
        self.details
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value)
    }
}

pub struct CoreAuditEventBuilder {
    event: CoreAuditEvent,
}

impl CoreAuditEventBuilder {
    pub fn new(stage: CoreAuditStage) -> Self {
        Self {
            event: CoreAuditEvent::new(stage),
        }
    }

    pub fn detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.event.details.push((key.into(), value.into()));
        self
    }

    pub fn finish(self) -> CoreAuditEvent {
        self.event
    }
}

pub trait CoreAudit {
    fn record(&self, event: CoreAuditEvent);
}

#[derive(Debug, Default)]
pub struct NullCoreAudit;

impl CoreAudit for NullCoreAudit {
    fn record(&self, _event: CoreAuditEvent) {}
}

/// Keeps every record in memory.
#[derive(Debug, Default)]
pub struct BufferedCoreAudit {
    events: Mutex<Vec<CoreAuditEvent>>,
}

impl BufferedCoreAudit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<CoreAuditEvent> {
        self.events
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    pub fn stages(&self) -> Vec<CoreAuditStage> {
        self.events().into_iter().map(|event| event.stage).collect()
    }
}

impl CoreAudit for BufferedCoreAudit {
    fn record(&self, event: CoreAuditEvent) {
        if let Ok(mut guard) = self.events.lock() {
            guard.push(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffered_audit_keeps_details() {
        let audit = BufferedCoreAudit::new();
        audit.record(
            CoreAuditEventBuilder::new(CoreAuditStage::CascadeAborted)
                .detail("cascade", "update")
                .finish(),
        );
        let events = audit.events();
        assert_eq!(audit.stages(), vec![CoreAuditStage::CascadeAborted]);
        assert_eq!(events[0].detail("cascade"), Some(&Value::from("update")));
    }
}
