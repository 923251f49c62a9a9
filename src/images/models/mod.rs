pub mod encoded_image;
pub mod image_payload;
