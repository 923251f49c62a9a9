use axum::{
    extract::{Multipart, State},
    Json,
};

use crate::{
    app::{
        models::{api_error::ApiError, json_from_request::JsonFromRequest},
        util::multipart::multipart::get_form,
    },
    AppState,
};

use super::{
    dtos::generate_image_dto::GenerateImageDto,
    models::generation_response::{GenerationResponse, MeteredGenerationResponse},
    service,
};

pub async fn remove_background(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<GenerationResponse>, ApiError> {
    let mut form = get_form(multipart).await?;
    let image = form.take_image("image")?;

    match service::remove_background(image, &state.gateway, state.events.as_ref()).await {
        Ok(image_url) => Ok(Json(GenerationResponse::new(image_url))),
        Err(e) => Err(e.into()),
    }
}

pub async fn generate_image(
    State(state): State<AppState>,
    JsonFromRequest(dto): JsonFromRequest<GenerateImageDto>,
) -> Result<Json<MeteredGenerationResponse>, ApiError> {
    match service::generate_image_metered(dto, &state.gateway, &state.quota, state.events.as_ref())
        .await
    {
        Ok(response) => Ok(Json(response)),
        Err(e) => Err(e),
    }
}

pub async fn style_image_single(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<GenerationResponse>, ApiError> {
    let mut form = get_form(multipart).await?;
    let image = form.take_image("image")?;

    match service::style_single(
        image,
        form.text("style"),
        &state.gateway,
        state.events.as_ref(),
    )
    .await
    {
        Ok(image_url) => Ok(Json(GenerationResponse::new(image_url))),
        Err(e) => Err(e.into()),
    }
}

pub async fn style_image(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<GenerationResponse>, ApiError> {
    let mut form = get_form(multipart).await?;
    let image1 = form.take_image("image1")?;
    let image2 = form.take_image("image2")?;

    match service::style_dual(
        image1,
        image2,
        form.text("style"),
        &state.gateway,
        state.events.as_ref(),
    )
    .await
    {
        Ok(image_url) => Ok(Json(GenerationResponse::new(image_url))),
        Err(e) => Err(e.into()),
    }
}

pub async fn add_tattoo(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<GenerationResponse>, ApiError> {
    let mut form = get_form(multipart).await?;
    let tattoo = form.take_image("resizedImage")?;
    let photo = form.take_image("originalPhoto")?;

    match service::add_tattoo(
        tattoo,
        photo,
        form.text("prompt"),
        &state.gateway,
        state.events.as_ref(),
    )
    .await
    {
        Ok(image_url) => Ok(Json(GenerationResponse::new(image_url))),
        Err(e) => Err(e.into()),
    }
}

pub async fn generate_with_references(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<GenerationResponse>, ApiError> {
    let mut form = get_form(multipart).await?;
    let references = ["image1", "image2"]
        .into_iter()
        .map(|field_name| form.take_image(field_name))
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .flatten()
        .collect();

    match service::generate_with_references(
        references,
        form.text("prompt"),
        &state.gateway,
        state.events.as_ref(),
    )
    .await
    {
        Ok(image_url) => Ok(Json(GenerationResponse::new(image_url))),
        Err(e) => Err(e.into()),
    }
}
