use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio_retry::{strategy::FixedInterval, RetryIf};

use crate::app::util::events::{EventSink, PipelineEvent};

use super::errors::{classify_provider_error, GenerationError, ProviderError};

/// An external image model, invoked synchronously with a model id and an
/// input map.
#[async_trait]
pub trait ImageProvider: Send + Sync {
    async fn run(&self, model: &str, input: &Map<String, Value>) -> Result<Value, ProviderError>;
}

pub struct Gateway {
    provider: Arc<dyn ImageProvider>,
    events: Arc<dyn EventSink>,
    max_retries: usize,
    retry_interval: Duration,
}

impl Gateway {
    pub fn new(provider: Arc<dyn ImageProvider>, events: Arc<dyn EventSink>) -> Self {
        Self {
            provider,
            events,
            max_retries: 0,
            retry_interval: Duration::from_secs(2),
        }
    }

    /// Retries apply to `GenerationFailed` only.
    pub fn with_retries(mut self, max_retries: usize, retry_interval: Duration) -> Self {
        self.max_retries = max_retries;
        self.retry_interval = retry_interval;
        self
    }

    pub async fn invoke(
        &self,
        model: &str,
        input: &Map<String, Value>,
    ) -> Result<Value, GenerationError> {
        let retry_strategy =
            FixedInterval::from_millis(self.retry_interval.as_millis() as u64).take(self.max_retries);

        RetryIf::start(
            retry_strategy,
            || self.invoke_once(model, input),
            |e: &GenerationError| e.is_retryable(),
        )
        .await
    }

    async fn invoke_once(
        &self,
        model: &str,
        input: &Map<String, Value>,
    ) -> Result<Value, GenerationError> {
        match self.provider.run(model, input).await {
            Ok(output) => Ok(output),
            Err(e) => {
                tracing::error!(model, error = %e, "provider invocation failed");
                Err(self.map_error(&e))
            }
        }
    }

    fn map_error(&self, e: &ProviderError) -> GenerationError {
        let (error, pattern) = classify_provider_error(&e.message);

        self.events.emit(PipelineEvent::ErrorKindMapped {
            kind: error.kind.value(),
            pattern,
        });

        error
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::json;

    use crate::{app::util::events::MemorySink, provider::errors::GenerationErrorKind};

    use super::*;

    struct FailingProvider {
        message: &'static str,
        calls: AtomicUsize,
    }

    impl FailingProvider {
        fn new(message: &'static str) -> Arc<Self> {
            Arc::new(Self {
                message,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl ImageProvider for FailingProvider {
        async fn run(&self, _model: &str, _input: &Map<String, Value>) -> Result<Value, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(ProviderError::new(self.message))
        }
    }

    struct EchoProvider;

    #[async_trait]
    impl ImageProvider for EchoProvider {
        async fn run(&self, model: &str, input: &Map<String, Value>) -> Result<Value, ProviderError> {
            Ok(json!({ "model": model, "input": input }))
        }
    }

    #[tokio::test]
    async fn passes_output_through() {
        let gateway = Gateway::new(Arc::new(EchoProvider), Arc::new(MemorySink::default()));
        let mut input = Map::new();
        input.insert("prompt".to_string(), json!("a cat"));

        let output = gateway.invoke("owner/model", &input).await.unwrap();

        assert_eq!(output["model"], "owner/model");
        assert_eq!(output["input"]["prompt"], "a cat");
    }

    #[tokio::test]
    async fn single_attempt_by_default() {
        let provider = FailingProvider::new("Prediction failed: boom");
        let gateway = Gateway::new(provider.clone(), Arc::new(MemorySink::default()));

        let e = gateway.invoke("owner/model", &Map::new()).await.unwrap_err();

        assert_eq!(e.kind, GenerationErrorKind::GenerationFailed);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_transient_failures_up_to_limit() {
        let provider = FailingProvider::new("status 429 Too Many Requests");
        let gateway = Gateway::new(provider.clone(), Arc::new(MemorySink::default()))
            .with_retries(2, Duration::from_millis(1));

        let e = gateway.invoke("owner/model", &Map::new()).await.unwrap_err();

        assert_eq!(e.kind, GenerationErrorKind::GenerationFailed);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn never_retries_definitive_failures() {
        for message in ["NSFW content detected", "status 402 Payment Required", "socket hang up"] {
            let provider = FailingProvider::new(message);
            let gateway = Gateway::new(provider.clone(), Arc::new(MemorySink::default()))
                .with_retries(3, Duration::from_millis(1));

            gateway.invoke("owner/model", &Map::new()).await.unwrap_err();

            assert_eq!(provider.calls.load(Ordering::SeqCst), 1, "{}", message);
        }
    }

    #[tokio::test]
    async fn emits_mapped_kind() {
        let sink = Arc::new(MemorySink::default());
        let gateway = Gateway::new(FailingProvider::new("status 402"), sink.clone());

        gateway.invoke("owner/model", &Map::new()).await.unwrap_err();

        assert_eq!(
            sink.events(),
            vec![PipelineEvent::ErrorKindMapped {
                kind: "PaymentRequired",
                pattern: Some("402"),
            }]
        );
    }
}
