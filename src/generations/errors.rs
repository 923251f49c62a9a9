use crate::provider::errors::GenerationError;

#[derive(Debug)]
pub enum GenerationsApiError {
    PromptRequired,
    StyleRequired,
    ImageRequired,
    FirstImageRequired,
    TattooImageRequired,
    PhotoRequired,
}

impl GenerationsApiError {
    pub fn value(&self) -> GenerationError {
        match *self {
            Self::PromptRequired => GenerationError::validation("prompt is required."),
            Self::StyleRequired => GenerationError::validation("style is required."),
            Self::ImageRequired => GenerationError::validation("image is required."),
            Self::FirstImageRequired => GenerationError::validation("image1 is required."),
            Self::TattooImageRequired => GenerationError::validation("resizedImage is required."),
            Self::PhotoRequired => GenerationError::validation("originalPhoto is required."),
        }
    }
}
