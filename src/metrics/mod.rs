//! Loop counters and frame-rate smoothing.

use crate::logging::{LogEvent, LogFields, LogLevel};
use serde_json::json;
use std::time::Duration;

pub mod fps;

pub use fps::FpsCounter;

#[derive(Debug, Default, Clone)]
pub struct CoreMetrics {
    frames: u64,
    resume_passes: u64,
    update_passes: u64,
    aborted_cascades: u64,
    contexts_created: u64,
    contexts_destroyed: u64,
}

impl CoreMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_frame(&mut self) {
        self.frames = self.frames.saturating_add(1);
    }

    pub fn record_resume(&mut self) {
        self.resume_passes = self.resume_passes.saturating_add(1);
    }

    pub fn record_update(&mut self) {
        self.update_passes = self.update_passes.saturating_add(1);
    }

    pub fn record_abort(&mut self) {
        self.aborted_cascades = self.aborted_cascades.saturating_add(1);
    }

    pub fn record_created(&mut self) {
        self.contexts_created = self.contexts_created.saturating_add(1);
    }

    pub fn record_destroyed(&mut self) {
        self.contexts_destroyed = self.contexts_destroyed.saturating_add(1);
    }

    pub fn snapshot(&self, uptime: Duration) -> MetricSnapshot {
        MetricSnapshot {
            uptime_ms: uptime.as_millis() as u64,
            frames: self.frames,
            resume_passes: self.resume_passes,
            update_passes: self.update_passes,
            aborted_cascades: self.aborted_cascades,
            contexts_created: self.contexts_created,
            contexts_destroyed: self.contexts_destroyed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricSnapshot {
    pub uptime_ms: u64,
    pub frames: u64,
    pub resume_passes: u64,
    pub update_passes: u64,
    pub aborted_cascades: u64,
    pub contexts_created: u64,
    pub contexts_destroyed: u64,
}

impl MetricSnapshot {
    pub fn to_log_event(&self, target: &str) -> LogEvent {
        LogEvent::with_fields(LogLevel::Info, target, "core_metrics", self.as_fields())
    }

    pub fn as_fields(&self) -> LogFields {
        let mut map = LogFields::new();
        map.insert("uptime_ms".to_string(), json!(self.uptime_ms));
        map.insert("frames".to_string(), json!(self.frames));
        map.insert("resume_passes".to_string(), json!(self.resume_passes));
        map.insert("update_passes".to_string(), json!(self.update_passes));
        map.insert("aborted_cascades".to_string(), json!(self.aborted_cascades));
        map.insert("contexts_created".to_string(), json!(self.contexts_created));
        map.insert("contexts_destroyed".to_string(), json!(self.contexts_destroyed));
        map
    }
}
