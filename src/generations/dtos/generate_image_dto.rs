use serde::Deserialize;
use serde_json::{Map, Value};
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct GenerateImageDto {
    #[serde(default)]
    #[validate(length(
        min = 1,
        max = 2000,
        message = "prompt must be between 1 and 2000 characters."
    ))]
    pub prompt: String,
    #[serde(default, rename = "userId")]
    pub user_id: Option<String>,
    /// Provider options, forwarded as-is.
    #[serde(flatten)]
    pub options: Map<String, Value>,
}

impl GenerateImageDto {
    pub fn sanitized(self) -> Self {
        Self {
            prompt: self.prompt.trim().replace('\n', " ").replace('\r', ""),
            user_id: self.user_id,
            options: self.options,
        }
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }
}
