use std::sync::Mutex;

/// Decision points of the generation pipeline worth observing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineEvent {
    NormalizationFallback {
        reason: String,
    },
    ExtractionMethodChosen {
        method: &'static str,
    },
    ErrorKindMapped {
        kind: &'static str,
        pattern: Option<&'static str>,
    },
    QuotaDecided {
        user_id: String,
        decision: String,
    },
}

pub trait EventSink: Send + Sync {
    fn emit(&self, event: PipelineEvent);
}

/// Forwards events to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: PipelineEvent) {
        match event {
            PipelineEvent::NormalizationFallback { reason } => {
                tracing::warn!(%reason, "image normalization failed, sending original")
            }
            PipelineEvent::ExtractionMethodChosen { method } => {
                tracing::debug!(method, "extracted image url")
            }
            PipelineEvent::ErrorKindMapped { kind, pattern } => {
                tracing::warn!(kind, ?pattern, "provider error mapped")
            }
            PipelineEvent::QuotaDecided { user_id, decision } => {
                tracing::info!(%user_id, %decision, "quota decided")
            }
        }
    }
}

/// Keeps every emitted event in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<PipelineEvent>>,
}

impl MemorySink {
    pub fn events(&self) -> Vec<PipelineEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl EventSink for MemorySink {
    fn emit(&self, event: PipelineEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }
}
