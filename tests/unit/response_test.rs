//! Unit tests for output materialization

use flux_imaging::backend::traits::ModelInfo;
use flux_imaging::error::AppError;
use flux_imaging::gateway::{GenerationResult, Mode, ResolvedParameters};
use flux_imaging::response::{base64, png, Delivery, MaterializedOutput, Materializer, ResponseFormat};
use image::{Rgb, RgbImage};

fn gradient(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| Rgb([(x * 7) as u8, (y * 13) as u8, ((x + y) * 3) as u8]))
}

fn result() -> GenerationResult {
    GenerationResult {
        image: gradient(16, 8),
        params: ResolvedParameters {
            mode: Mode::Generate,
            guidance_scale: 3.5,
            num_inference_steps: 8,
            width: 16,
            height: 8,
            seed: 42,
        },
        model: ModelInfo {
            base_model: "test/model".to_string(),
            loras: vec![],
        },
        prior_model: None,
    }
}

#[test]
fn test_png_round_trip_is_pixel_identical() {
    let original = gradient(37, 21);
    let decoded = png::decode(&png::encode(&original).unwrap()).unwrap();
    assert_eq!(decoded.dimensions(), original.dimensions());
    assert_eq!(decoded.as_raw(), original.as_raw());
}

#[test]
fn test_base64_decode_data_url() {
    let decoded = base64::decode("data:image/png;base64,SGVsbG8sIFdvcmxkIQ==").unwrap();
    assert_eq!(b"Hello, World!", decoded.as_slice());
}

#[test]
fn test_response_format_to_delivery() {
    assert_eq!(Delivery::from(ResponseFormat::Url), Delivery::External);
    assert_eq!(Delivery::from(ResponseFormat::Base64Json), Delivery::Embedded);
}

#[tokio::test]
async fn test_external_without_store_never_embeds() {
    let materializer = Materializer::new(None);
    let err = materializer.materialize(&result(), Delivery::External).await.unwrap_err();
    assert!(matches!(err, AppError::ArtifactStore(_)));
    assert_eq!(err.status(), axum::http::StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_embedded_output_decodes_to_result_image() {
    let materializer = Materializer::new(None);
    let output = materializer.materialize(&result(), Delivery::Embedded).await.unwrap();

    let MaterializedOutput::Base64(encoded) = output else {
        panic!("expected base64 output, got {:?}", output);
    };
    let image = png::decode(&base64::decode(&encoded).unwrap()).unwrap();
    assert_eq!(image.as_raw(), result().image.as_raw());
}

#[tokio::test]
async fn test_raw_output_is_png() {
    let materializer = Materializer::new(None);
    let MaterializedOutput::Raw(bytes) = materializer.materialize(&result(), Delivery::Raw).await.unwrap() else {
        panic!("expected raw output");
    };
    assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
}
