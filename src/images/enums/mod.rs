pub mod image_field;
