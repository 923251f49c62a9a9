use regex::Regex;

use crate::images::errors::NormalizeError;

lazy_static! {
    static ref DATA_URI_REGEX: Regex = Regex::new(r"^data:([^;,]*)(?:;[^,]*)?,").unwrap();
}

/// Raw image bytes plus the media type they were declared with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub media_type: Option<String>,
    pub data: Vec<u8>,
}

impl EncodedImage {
    /// Accepts a `data:` URI or bare base64.
    pub fn parse(value: &str) -> Result<Self, NormalizeError> {
        let value = value.trim();

        let (media_type, payload) = match DATA_URI_REGEX.captures(value) {
            Some(captures) => {
                let prefix_len = captures.get(0).map(|m| m.end()).unwrap_or(0);
                let media_type = captures
                    .get(1)
                    .map(|m| m.as_str().to_string())
                    .filter(|m| !m.is_empty());

                (media_type, &value[prefix_len..])
            }
            None => (None, value),
        };

        if payload.is_empty() {
            return Err(NormalizeError::Empty);
        }

        let data = base64::decode(payload)?;

        Ok(Self { media_type, data })
    }

    pub fn to_data_uri(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.media_type
                .as_deref()
                .unwrap_or("application/octet-stream"),
            base64::encode(&self.data)
        )
    }
}
