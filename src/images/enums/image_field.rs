/// Provider input keys that carry images and get normalized before upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ImageField {
    Image,
    Mask,
    InputImage,
    InputImage1,
    InputImage2,
    ImageInput,
}

impl ImageField {
    pub const ALL: [ImageField; 6] = [
        Self::Image,
        Self::Mask,
        Self::InputImage,
        Self::InputImage1,
        Self::InputImage2,
        Self::ImageInput,
    ];

    pub fn value(&self) -> &'static str {
        match *self {
            Self::Image => "image",
            Self::Mask => "mask",
            Self::InputImage => "input_image",
            Self::InputImage1 => "input_image_1",
            Self::InputImage2 => "input_image_2",
            Self::ImageInput => "image_input",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.value() == key)
    }
}
