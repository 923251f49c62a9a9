use serde_json::{json, Map, Value};
use uuid::Uuid;
use validator::Validate;

use crate::{
    app::{models::api_error::ApiError, util::events::EventSink},
    images::{enums::image_field::ImageField, service::normalize_payload},
    provider::{errors::GenerationError, extractor::extract_url, service::Gateway},
    quota::{
        enums::quota_decision::{DenialReason, QuotaDecision},
        errors::QuotaApiError,
        service::QuotaGuard,
    },
};

use super::{
    dtos::generate_image_dto::GenerateImageDto,
    enums::generation_model::GenerationModel,
    errors::GenerationsApiError,
    models::{
        generation_request::{build_input, GenerationRequest},
        generation_response::MeteredGenerationResponse,
    },
};

/// Normalizes images, invokes the model and extracts the result URL.
pub async fn run_generation(
    model: &str,
    request: GenerationRequest,
    gateway: &Gateway,
    events: &dyn EventSink,
) -> Result<String, GenerationError> {
    let request_id = Uuid::new_v4();
    let (prompt, images, options) = request.into_parts();

    tracing::info!(%request_id, model, images = images.len(), "starting generation");

    let images = if images.is_empty() {
        images
    } else {
        normalize_payload(images, events).await
    };
    let input = build_input(prompt, images, options);

    let output = gateway.invoke(model, &input).await?;
    let url = extract_url(&output, events)?;

    tracing::info!(%request_id, model, "generation finished");

    Ok(url)
}

pub async fn remove_background(
    image: Option<String>,
    gateway: &Gateway,
    events: &dyn EventSink,
) -> Result<String, GenerationError> {
    let Some(image) = image else {
        return Err(GenerationsApiError::ImageRequired.value());
    };

    let request = GenerationRequest::new(None)
        .image(ImageField::Image, image)
        .option("format", json!("png"))
        .option("background_type", json!("rgba"));

    run_generation(GenerationModel::BACKGROUND_REMOVER, request, gateway, events).await
}

pub async fn generate_image(
    prompt: &str,
    options: Map<String, Value>,
    gateway: &Gateway,
    events: &dyn EventSink,
) -> Result<String, GenerationError> {
    let prompt = prompt.trim();
    if prompt.is_empty() {
        return Err(GenerationsApiError::PromptRequired.value());
    }

    let request = GenerationRequest::new(Some(prompt))
        .option("num_outputs", json!(1))
        .option("aspect_ratio", json!("1:1"))
        .option("output_format", json!("webp"))
        .option("output_quality", json!(80))
        .option("num_inference_steps", json!(4))
        .option("go_fast", json!(true))
        .options(options);

    run_generation(GenerationModel::TEXT_TO_IMAGE, request, gateway, events).await
}

/// Quota-gated text-to-image. Usage is counted only for free users and only
/// after the generation succeeded.
pub async fn generate_image_metered(
    dto: GenerateImageDto,
    gateway: &Gateway,
    quota: &QuotaGuard,
    events: &dyn EventSink,
) -> Result<MeteredGenerationResponse, ApiError> {
    let dto = dto.sanitized();

    let decision = quota.check(dto.user_id()).await?;
    let remaining = match decision {
        QuotaDecision::Subscribed => None,
        QuotaDecision::Free { remaining } => Some(remaining),
        QuotaDecision::Denied(DenialReason::LimitReached) => {
            return Err(QuotaApiError::DailyLimitReached.value())
        }
        QuotaDecision::Denied(DenialReason::CheckFailed) => {
            return Err(QuotaApiError::UsageUnavailable.value())
        }
    };

    if let Err(e) = dto.validate() {
        return Err(ApiError::validation(e.to_string()));
    }

    let image_url = generate_image(&dto.prompt, dto.options.clone(), gateway, events).await?;

    if let (QuotaDecision::Free { .. }, Some(user_id)) = (decision, dto.user_id()) {
        if let Err(e) = quota.record_usage(user_id).await {
            tracing::error!(%user_id, %e, "failed to record usage");
        }
    }

    Ok(MeteredGenerationResponse {
        success: true,
        image_url,
        remaining,
        is_subscribed: decision == QuotaDecision::Subscribed,
    })
}

pub async fn style_single(
    image: Option<String>,
    style: Option<&str>,
    gateway: &Gateway,
    events: &dyn EventSink,
) -> Result<String, GenerationError> {
    let Some(image) = image else {
        return Err(GenerationsApiError::ImageRequired.value());
    };
    let Some(style) = style else {
        return Err(GenerationsApiError::StyleRequired.value());
    };

    let request = GenerationRequest::new(Some(&single_style_prompt(style)))
        .image(ImageField::InputImage, image)
        .option("aspect_ratio", json!("match_input_image"))
        .option("output_format", json!("jpg"))
        .option("safety_tolerance", json!(2));

    run_generation(GenerationModel::STYLE_SINGLE, request, gateway, events).await
}

/// Restyles `image1`, using `image2` as the style reference when present.
pub async fn style_dual(
    image1: Option<String>,
    image2: Option<String>,
    style: Option<&str>,
    gateway: &Gateway,
    events: &dyn EventSink,
) -> Result<String, GenerationError> {
    let Some(image1) = image1 else {
        return Err(GenerationsApiError::FirstImageRequired.value());
    };
    let Some(style) = style else {
        return Err(GenerationsApiError::StyleRequired.value());
    };
    let Some(image2) = image2 else {
        return style_single(Some(image1), Some(style), gateway, events).await;
    };

    let request = GenerationRequest::new(Some(&dual_style_prompt(style)))
        .image(ImageField::InputImage1, image1)
        .image(ImageField::InputImage2, image2)
        .option("aspect_ratio", json!("match_input_image"))
        .option("output_format", json!("png"))
        .option("safety_tolerance", json!(2));

    run_generation(GenerationModel::STYLE_DUAL, request, gateway, events).await
}

/// Composites the tattoo design in `tattoo` onto `photo`.
pub async fn add_tattoo(
    tattoo: Option<String>,
    photo: Option<String>,
    prompt: Option<&str>,
    gateway: &Gateway,
    events: &dyn EventSink,
) -> Result<String, GenerationError> {
    let Some(tattoo) = tattoo else {
        return Err(GenerationsApiError::TattooImageRequired.value());
    };
    let Some(photo) = photo else {
        return Err(GenerationsApiError::PhotoRequired.value());
    };
    let Some(prompt) = prompt else {
        return Err(GenerationsApiError::PromptRequired.value());
    };

    let request = GenerationRequest::new(Some(prompt))
        .image(ImageField::InputImage1, photo)
        .image(ImageField::InputImage2, tattoo)
        .option("aspect_ratio", json!("match_input_image"))
        .option("output_format", json!("png"))
        .option("safety_tolerance", json!(2));

    run_generation(GenerationModel::TATTOO_COMPOSITE, request, gateway, events).await
}

pub async fn generate_with_references(
    references: Vec<String>,
    prompt: Option<&str>,
    gateway: &Gateway,
    events: &dyn EventSink,
) -> Result<String, GenerationError> {
    let Some(prompt) = prompt else {
        return Err(GenerationsApiError::PromptRequired.value());
    };

    let mut request = GenerationRequest::new(Some(prompt)).option("output_format", json!("jpg"));
    if !references.is_empty() {
        request = request.images(ImageField::ImageInput, references);
    }

    run_generation(GenerationModel::REFERENCE_GENERATION, request, gateway, events).await
}

fn single_style_prompt(style: &str) -> String {
    format!(
        "Transform this image into {} style. Keep the subject, pose and composition unchanged.",
        style
    )
}

fn dual_style_prompt(style: &str) -> String {
    format!(
        "Redraw the first image in {} style, using the second image as the style reference. \
         Keep the subject and composition of the first image.",
        style
    )
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;

    use crate::{
        app::util::events::MemorySink,
        provider::{
            errors::{GenerationErrorKind, ProviderError},
            service::ImageProvider,
        },
    };

    use super::*;

    #[derive(Default)]
    struct RecordingProvider {
        calls: Mutex<Vec<(String, Map<String, Value>)>>,
    }

    impl RecordingProvider {
        fn calls(&self) -> Vec<(String, Map<String, Value>)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ImageProvider for RecordingProvider {
        async fn run(
            &self,
            model: &str,
            input: &Map<String, Value>,
        ) -> Result<Value, ProviderError> {
            self.calls
                .lock()
                .unwrap()
                .push((model.to_string(), input.clone()));
            Ok(json!(["https://cdn.example.com/out.png"]))
        }
    }

    fn gateway(provider: Arc<RecordingProvider>) -> Gateway {
        Gateway::new(provider, Arc::new(MemorySink::default()))
    }

    #[tokio::test]
    async fn text_to_image_sends_fixed_defaults() {
        let provider = Arc::new(RecordingProvider::default());
        let sink = MemorySink::default();

        let url = generate_image("a cat", Map::new(), &gateway(provider.clone()), &sink)
            .await
            .unwrap();

        assert_eq!(url, "https://cdn.example.com/out.png");
        let calls = provider.calls();
        let (model, input) = &calls[0];
        assert_eq!(model, GenerationModel::TEXT_TO_IMAGE);
        assert_eq!(input["prompt"], "a cat");
        assert_eq!(input["num_outputs"], 1);
        assert_eq!(input["aspect_ratio"], "1:1");
        assert_eq!(input["output_format"], "webp");
        assert_eq!(input["output_quality"], 80);
        assert_eq!(input["num_inference_steps"], 4);
        assert_eq!(input["go_fast"], true);
    }

    #[tokio::test]
    async fn blank_prompt_is_rejected_before_the_provider() {
        let provider = Arc::new(RecordingProvider::default());
        let sink = MemorySink::default();

        let e = generate_image("   ", Map::new(), &gateway(provider.clone()), &sink)
            .await
            .unwrap_err();

        assert_eq!(e.kind, GenerationErrorKind::ValidationError);
        assert!(provider.calls().is_empty());
    }

    #[tokio::test]
    async fn background_removal_requires_an_image() {
        let provider = Arc::new(RecordingProvider::default());
        let sink = MemorySink::default();

        let e = remove_background(None, &gateway(provider.clone()), &sink)
            .await
            .unwrap_err();

        assert_eq!(e.kind, GenerationErrorKind::ValidationError);
        assert!(provider.calls().is_empty());
    }

    #[tokio::test]
    async fn dual_style_without_second_image_uses_single_model() {
        let provider = Arc::new(RecordingProvider::default());
        let sink = MemorySink::default();

        style_dual(
            Some("not-an-image".to_string()),
            None,
            Some("watercolor"),
            &gateway(provider.clone()),
            &sink,
        )
        .await
        .unwrap();

        let calls = provider.calls();
        assert_eq!(calls[0].0, GenerationModel::STYLE_SINGLE);
        assert_eq!(calls[0].1["input_image"], "not-an-image");
        assert_eq!(calls[0].1["output_format"], "jpg");
        assert!(calls[0].1["prompt"]
            .as_str()
            .unwrap()
            .contains("watercolor"));
    }

    #[tokio::test]
    async fn dual_style_sends_both_images() {
        let provider = Arc::new(RecordingProvider::default());
        let sink = MemorySink::default();

        style_dual(
            Some("first".to_string()),
            Some("second".to_string()),
            Some("ink"),
            &gateway(provider.clone()),
            &sink,
        )
        .await
        .unwrap();

        let calls = provider.calls();
        assert_eq!(calls[0].0, GenerationModel::STYLE_DUAL);
        assert_eq!(calls[0].1["input_image_1"], "first");
        assert_eq!(calls[0].1["input_image_2"], "second");
        assert_eq!(calls[0].1["output_format"], "png");
    }

    #[tokio::test]
    async fn tattoo_places_photo_first_and_keeps_prompt() {
        let provider = Arc::new(RecordingProvider::default());
        let sink = MemorySink::default();

        add_tattoo(
            Some("tattoo".to_string()),
            Some("photo".to_string()),
            Some("place the tattoo on the forearm"),
            &gateway(provider.clone()),
            &sink,
        )
        .await
        .unwrap();

        let calls = provider.calls();
        assert_eq!(calls[0].0, GenerationModel::TATTOO_COMPOSITE);
        assert_eq!(calls[0].1["input_image_1"], "photo");
        assert_eq!(calls[0].1["input_image_2"], "tattoo");
        assert_eq!(calls[0].1["prompt"], "place the tattoo on the forearm");
    }

    #[tokio::test]
    async fn references_are_sent_in_order() {
        let provider = Arc::new(RecordingProvider::default());
        let sink = MemorySink::default();

        generate_with_references(
            vec!["a".to_string(), "b".to_string()],
            Some("mix them"),
            &gateway(provider.clone()),
            &sink,
        )
        .await
        .unwrap();

        let calls = provider.calls();
        assert_eq!(calls[0].0, GenerationModel::REFERENCE_GENERATION);
        assert_eq!(calls[0].1["image_input"], json!(["a", "b"]));
        assert_eq!(calls[0].1["output_format"], "jpg");
    }

    #[tokio::test]
    async fn references_are_optional() {
        let provider = Arc::new(RecordingProvider::default());
        let sink = MemorySink::default();

        generate_with_references(Vec::new(), Some("a fox"), &gateway(provider.clone()), &sink)
            .await
            .unwrap();

        assert!(provider.calls()[0].1.get("image_input").is_none());
    }
}
