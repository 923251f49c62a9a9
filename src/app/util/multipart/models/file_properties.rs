use bytes::Bytes;
use mime::Mime;

use crate::images::models::encoded_image::EncodedImage;

#[derive(Debug)]
pub struct FileProperties {
    pub field_name: String,
    pub file_name: String,
    pub mime_type: Mime,
    pub data: Bytes,
}

impl FileProperties {
    /// Images, plus untyped uploads that the normalizer gets to sniff.
    pub fn is_image(&self) -> bool {
        self.mime_type.type_() == mime::IMAGE || self.mime_type == mime::APPLICATION_OCTET_STREAM
    }

    pub fn to_data_uri(&self) -> String {
        EncodedImage {
            media_type: Some(self.mime_type.essence_str().to_string()),
            data: self.data.to_vec(),
        }
        .to_data_uri()
    }
}
