use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResponse {
    pub success: bool,
    pub image_url: String,
}

impl GenerationResponse {
    pub fn new(image_url: String) -> Self {
        Self {
            success: true,
            image_url,
        }
    }
}

/// Response of quota-gated generations. `remaining` is counted before this
/// generation and is `null` for subscribers.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeteredGenerationResponse {
    pub success: bool,
    pub image_url: String,
    pub remaining: Option<u32>,
    pub is_subscribed: bool,
}
