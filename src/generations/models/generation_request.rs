use serde_json::{Map, Value};

use crate::images::{
    enums::image_field::ImageField,
    models::image_payload::{ImagePayload, ImageValue},
};

/// Everything a single provider call needs, apart from the model id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationRequest {
    prompt: Option<String>,
    images: ImagePayload,
    options: Map<String, Value>,
}

impl GenerationRequest {
    pub fn new(prompt: Option<&str>) -> Self {
        Self {
            prompt: prompt.map(str::to_string),
            ..Self::default()
        }
    }

    pub fn image(mut self, field: ImageField, image: String) -> Self {
        self.images.insert(field, ImageValue::Single(image));
        self
    }

    pub fn images(mut self, field: ImageField, images: Vec<String>) -> Self {
        self.images.insert(field, ImageValue::Sequence(images));
        self
    }

    pub fn option(mut self, key: &str, value: Value) -> Self {
        self.options.insert(key.to_string(), value);
        self
    }

    /// Merges caller-supplied options over the defaults. Image-valued keys
    /// that the normalizer recognizes move into the image payload.
    pub fn options(mut self, options: Map<String, Value>) -> Self {
        for (key, value) in options {
            match ImageField::from_key(&key).and_then(|field| Some((field, ImageValue::from_json(&value)?))) {
                Some((field, image)) => {
                    self.options.remove(&key);
                    self.images.insert(field, image);
                }
                None => {
                    self.options.insert(key, value);
                }
            }
        }
        self
    }

    pub fn into_parts(self) -> (Option<String>, ImagePayload, Map<String, Value>) {
        (self.prompt, self.images, self.options)
    }
}

/// Provider input map: options, then images, then the prompt.
pub fn build_input(
    prompt: Option<String>,
    images: ImagePayload,
    options: Map<String, Value>,
) -> Map<String, Value> {
    let mut input = options;

    for (field, value) in images {
        input.insert(field.value().to_string(), value.into_json());
    }

    if let Some(prompt) = prompt {
        input.insert("prompt".to_string(), Value::String(prompt));
    }

    input
}
