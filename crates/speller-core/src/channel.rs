//! Event channel: outbound telemetry and inbound model messages.
//!
//! The transport itself (pub/sub, websocket, pipe) is outside the session. The
//! session only sees [`EventSink`] for what it emits and [`ModelMessage`] for
//! what the classifier sends back.

use std::io::Write;
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use crate::error::ChannelError;
use crate::events::Event;

/// Outbound side of the event channel.
///
/// Events arrive in emission order from a single producer.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: Event) -> Result<(), ChannelError>;
}

/// Keeps every emitted event in memory. Clones share the same log.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    events: Arc<Mutex<Vec<Event>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn labels(&self) -> Vec<&'static str> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(Event::label)
            .collect()
    }

    pub fn clear(&self) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl EventSink for MemorySink {
    fn emit(&self, event: Event) -> Result<(), ChannelError> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
        Ok(())
    }
}

/// Writes one timestamped JSON object per line.
pub struct JsonLinesSink<W> {
    writer: Mutex<W>,
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl<W: Write + Send> EventSink for JsonLinesSink<W> {
    fn emit(&self, event: Event) -> Result<(), ChannelError> {
        let label = event.label();
        let failed = |message: String| ChannelError::EmitFailed { label, message };
        let line = serde_json::to_string(&event.stamp()).map_err(|e| failed(e.to_string()))?;
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        writeln!(writer, "{line}")
            .and_then(|()| writer.flush())
            .map_err(|e| failed(e.to_string()))
    }
}

/// Logs event labels and drops the payloads.
#[derive(Debug, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: Event) -> Result<(), ChannelError> {
        tracing::info!(label = event.label(), "event");
        Ok(())
    }
}

/// Message from the classifier side of the channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "label", content = "data", rename_all = "snake_case")]
pub enum ModelMessage {
    /// The model is fitted and ready to predict.
    Ready,
    /// The classifier picked a symbol.
    Predict { target: char },
}

impl ModelMessage {
    /// Decode one JSON message.
    pub fn parse(line: &str) -> Result<Self, ChannelError> {
        serde_json::from_str(line.trim()).map_err(|e| ChannelError::Malformed(e.to_string()))
    }
}
