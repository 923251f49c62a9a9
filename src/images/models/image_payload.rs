use std::collections::BTreeMap;

use serde_json::Value;

use crate::images::enums::image_field::ImageField;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageValue {
    Single(String),
    Sequence(Vec<String>),
}

impl ImageValue {
    /// Strings and arrays of strings are images; anything else is not.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::String(image) => Some(Self::Single(image.to_string())),
            Value::Array(items) => items
                .iter()
                .map(|item| item.as_str().map(str::to_string))
                .collect::<Option<Vec<_>>>()
                .map(Self::Sequence),
            _ => None,
        }
    }

    pub fn into_json(self) -> Value {
        match self {
            Self::Single(image) => Value::String(image),
            Self::Sequence(images) => Value::Array(images.into_iter().map(Value::String).collect()),
        }
    }
}

/// Image-valued provider inputs, keyed by recognized field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImagePayload {
    fields: BTreeMap<ImageField, ImageValue>,
}

impl ImagePayload {
    pub fn insert(&mut self, field: ImageField, value: ImageValue) {
        self.fields.insert(field, value);
    }

    pub fn get(&self, field: ImageField) -> Option<&ImageValue> {
        self.fields.get(&field)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl IntoIterator for ImagePayload {
    type Item = (ImageField, ImageValue);
    type IntoIter = std::collections::btree_map::IntoIter<ImageField, ImageValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

impl FromIterator<(ImageField, ImageValue)> for ImagePayload {
    fn from_iter<I: IntoIterator<Item = (ImageField, ImageValue)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}
