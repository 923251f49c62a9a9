use std::collections::HashMap;

use axum::extract::Multipart;

use crate::app::models::api_error::ApiError;

use super::models::file_properties::FileProperties;

/// Files and text fields of one multipart request.
#[derive(Debug, Default)]
pub struct MultipartForm {
    pub files: Vec<FileProperties>,
    pub fields: HashMap<String, String>,
}

impl MultipartForm {
    /// Removes the file uploaded under `field_name` and returns it as a data URI.
    pub fn take_image(&mut self, field_name: &str) -> Result<Option<String>, ApiError> {
        let Some(index) = self.files.iter().position(|f| f.field_name == field_name) else {
            return Ok(None);
        };

        let file = self.files.remove(index);
        if !file.is_image() {
            tracing::warn!(
                %field_name,
                file_name = %file.file_name,
                mime_type = %file.mime_type,
                "rejected non-image upload"
            );
            return Err(ApiError::validation(format!(
                "{} must be of type image.",
                field_name
            )));
        }

        Ok(Some(file.to_data_uri()))
    }

    pub fn text(&self, field_name: &str) -> Option<&str> {
        self.fields
            .get(field_name)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
    }
}

pub async fn get_form(mut multipart: Multipart) -> Result<MultipartForm, ApiError> {
    let mut form = MultipartForm::default();

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(%e, "failed to read multipart field");
                return Err(ApiError::validation("Malformed multipart body."));
            }
        };

        let field_name = field.name().unwrap_or("file").to_string();

        let Some(file_name) = field.file_name().map(str::to_string) else {
            match field.text().await {
                Ok(text) => {
                    form.fields.insert(field_name, text);
                }
                Err(e) => {
                    tracing::warn!(%e, %field_name, "failed to read multipart text field");
                    return Err(ApiError::validation("Malformed multipart body."));
                }
            }
            continue;
        };

        let mime_type = field
            .content_type()
            .and_then(|value| value.parse().ok())
            .unwrap_or(mime::APPLICATION_OCTET_STREAM);
        let data = match field.bytes().await {
            Ok(data) => data,
            Err(e) => {
                tracing::warn!(%e, %field_name, "failed to read multipart file");
                return Err(ApiError::validation("Malformed multipart body."));
            }
        };

        if data.is_empty() {
            continue;
        }

        form.files.push(FileProperties {
            field_name,
            file_name,
            mime_type,
            data,
        });
    }

    Ok(form)
}
