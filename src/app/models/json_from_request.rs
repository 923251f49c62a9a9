use axum::Json;
use axum_macros::FromRequest;

use super::api_error::ApiError;

/// `Json` extractor whose rejections render as a `ValidationError` envelope
/// instead of axum's plain-text body.
#[derive(FromRequest)]
#[from_request(via(Json), rejection(ApiError))]
pub struct JsonFromRequest<T>(pub T);

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        extract::FromRequest,
        http::{header::CONTENT_TYPE, Request, StatusCode},
    };
    use serde_json::Value;

    use super::*;

    fn request(body: &'static str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn extracts_valid_json() {
        let JsonFromRequest(value) =
            JsonFromRequest::<Value>::from_request(request("{\"prompt\":\"a cat\"}"), &())
                .await
                .unwrap();

        assert_eq!(value["prompt"], "a cat");
    }

    #[tokio::test]
    async fn syntax_errors_become_validation_errors() {
        let Err(e) = JsonFromRequest::<Value>::from_request(request("{\"prompt\""), &()).await
        else {
            panic!("malformed body was accepted");
        };

        assert_eq!(e.code, StatusCode::BAD_REQUEST);
        assert_eq!(e.error, "ValidationError");
    }
}
