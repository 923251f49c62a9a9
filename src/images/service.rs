use std::io::Cursor;

use futures::future::join_all;
use image::{codecs::jpeg::JpegEncoder, DynamicImage, ImageDecoder, ImageReader};

use crate::app::util::events::{EventSink, PipelineEvent};

use super::{
    errors::NormalizeError,
    models::{
        encoded_image::EncodedImage,
        image_payload::{ImagePayload, ImageValue},
    },
};

pub const JPEG_QUALITY: u8 = 90;

/// Applies EXIF orientation and re-encodes as a metadata-free JPEG data URI.
///
/// Never fails: on any error the original input is returned untouched and a
/// `NormalizationFallback` event is emitted.
pub async fn normalize(image: &str, events: &dyn EventSink) -> String {
    let input = image.to_string();
    let result = match tokio::task::spawn_blocking(move || reencode(&input)).await {
        Ok(result) => result,
        Err(e) => Err(NormalizeError::from(e)),
    };

    match result {
        Ok(normalized) => normalized,
        Err(e) => {
            events.emit(PipelineEvent::NormalizationFallback {
                reason: e.to_string(),
            });
            image.to_string()
        }
    }
}

/// Normalizes every image in the payload. Sequence fields are processed
/// concurrently and keep their order.
pub async fn normalize_payload(payload: ImagePayload, events: &dyn EventSink) -> ImagePayload {
    let mut normalized = ImagePayload::default();

    for (field, value) in payload {
        let value = match value {
            ImageValue::Single(image) => ImageValue::Single(normalize(&image, events).await),
            ImageValue::Sequence(images) => {
                let futures = images.iter().map(|image| normalize(image, events));
                ImageValue::Sequence(join_all(futures).await)
            }
        };

        normalized.insert(field, value);
    }

    normalized
}

pub fn reencode(image: &str) -> Result<String, NormalizeError> {
    let encoded = EncodedImage::parse(image)?;

    let mut decoder = ImageReader::new(Cursor::new(&encoded.data))
        .with_guessed_format()?
        .into_decoder()?;
    let orientation = decoder.orientation()?;

    let mut decoded = DynamicImage::from_decoder(decoder)?;
    decoded.apply_orientation(orientation);

    // JPEG has no alpha channel
    let rgb = decoded.to_rgb8();
    let mut buffer = Vec::new();
    rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut buffer, JPEG_QUALITY))?;

    tracing::debug!(
        width = rgb.width(),
        height = rgb.height(),
        bytes = buffer.len(),
        "normalized image"
    );

    Ok(EncodedImage {
        media_type: Some(mime::IMAGE_JPEG.to_string()),
        data: buffer,
    }
    .to_data_uri())
}

#[cfg(test)]
mod tests {
    use image::{GenericImageView, ImageFormat, Rgb, RgbImage};

    use crate::{app::util::events::MemorySink, images::enums::image_field::ImageField};

    use super::*;

    fn png_data_uri(width: u32, height: u32) -> String {
        let image = RgbImage::from_fn(width, height, |x, y| Rgb([(x * 40) as u8, (y * 40) as u8, 90]));
        let mut buffer = Cursor::new(Vec::new());
        image.write_to(&mut buffer, ImageFormat::Png).unwrap();

        format!("data:image/png;base64,{}", base64::encode(buffer.into_inner()))
    }

    /// A JPEG carrying an EXIF APP1 segment with orientation 6 (rotate 90 cw).
    fn rotated_jpeg_data_uri(width: u32, height: u32) -> String {
        let image = RgbImage::from_fn(width, height, |_, _| Rgb([200, 30, 30]));
        let mut jpeg = Vec::new();
        image
            .write_with_encoder(JpegEncoder::new_with_quality(&mut jpeg, 95))
            .unwrap();

        let mut exif = b"Exif\0\0".to_vec();
        exif.extend_from_slice(b"MM\0\x2a\0\0\0\x08");
        exif.extend_from_slice(&[0x00, 0x01]);
        exif.extend_from_slice(&[0x01, 0x12, 0x00, 0x03, 0x00, 0x00, 0x00, 0x01]);
        exif.extend_from_slice(&[0x00, 0x06, 0x00, 0x00]);
        exif.extend_from_slice(&[0x00, 0x00, 0x00, 0x00]);

        let segment_len = (exif.len() + 2) as u16;
        let mut segment = vec![0xff, 0xe1];
        segment.extend_from_slice(&segment_len.to_be_bytes());
        segment.extend_from_slice(&exif);

        let mut with_exif = jpeg[..2].to_vec();
        with_exif.extend_from_slice(&segment);
        with_exif.extend_from_slice(&jpeg[2..]);

        format!("data:image/jpeg;base64,{}", base64::encode(with_exif))
    }

    fn decode(data_uri: &str) -> DynamicImage {
        let encoded = EncodedImage::parse(data_uri).unwrap();
        image::load_from_memory(&encoded.data).unwrap()
    }

    #[tokio::test]
    async fn unparseable_image_is_returned_unchanged() {
        let sink = MemorySink::default();
        let input = "data:image/png;base64,bm90IGFuIGltYWdl";

        let output = normalize(input, &sink).await;

        assert_eq!(output, input);
        assert!(matches!(
            sink.events().as_slice(),
            [PipelineEvent::NormalizationFallback { .. }]
        ));
    }

    #[tokio::test]
    async fn non_base64_input_is_returned_unchanged() {
        let sink = MemorySink::default();
        let input = "https://example.com/cat.png";

        assert_eq!(normalize(input, &sink).await, input);
        assert_eq!(sink.events().len(), 1);
    }

    #[tokio::test]
    async fn valid_image_becomes_jpeg_with_same_dimensions() {
        let sink = MemorySink::default();

        let output = normalize(&png_data_uri(6, 3), &sink).await;

        assert!(output.starts_with("data:image/jpeg;base64,"));
        assert_eq!(decode(&output).dimensions(), (6, 3));
        assert!(sink.events().is_empty());
    }

    #[tokio::test]
    async fn exif_orientation_is_applied_and_dropped() {
        let sink = MemorySink::default();

        let output = normalize(&rotated_jpeg_data_uri(8, 4), &sink).await;
        assert_eq!(decode(&output).dimensions(), (4, 8));

        let again = normalize(&output, &sink).await;
        assert_eq!(decode(&again).dimensions(), (4, 8));
        assert!(sink.events().is_empty());
    }

    #[tokio::test]
    async fn renormalizing_is_stable() {
        let sink = MemorySink::default();

        let once = normalize(&png_data_uri(5, 7), &sink).await;
        let twice = normalize(&once, &sink).await;

        assert!(twice.starts_with("data:image/jpeg;base64,"));
        assert_eq!(decode(&once).dimensions(), decode(&twice).dimensions());
    }

    #[tokio::test]
    async fn sequence_keeps_order_and_isolates_failures() {
        let sink = MemorySink::default();
        let broken = "data:image/png;base64,AAAA".to_string();

        let payload: ImagePayload = [(
            ImageField::ImageInput,
            ImageValue::Sequence(vec![png_data_uri(2, 2), broken.clone(), png_data_uri(3, 1)]),
        )]
        .into_iter()
        .collect();

        let normalized = normalize_payload(payload, &sink).await;

        let Some(ImageValue::Sequence(images)) = normalized.get(ImageField::ImageInput) else {
            panic!("expected a sequence");
        };
        assert_eq!(images.len(), 3);
        assert_eq!(decode(&images[0]).dimensions(), (2, 2));
        assert_eq!(images[1], broken);
        assert_eq!(decode(&images[2]).dimensions(), (3, 1));
        assert_eq!(sink.events().len(), 1);
    }
}
