//! Unit tests for the endpoint adapters' parse and format functions

use flux_imaging::api::extract::{FormFields, UploadedFile};
use flux_imaging::api::native::{native_request, native_response};
use flux_imaging::api::openai::{image_job, parse_size, ImageEndpoint, OpenAiImageRequest, OpenAiJsonBody};
use flux_imaging::backend::traits::ModelInfo;
use flux_imaging::config::GenerationConfig;
use flux_imaging::error::AppError;
use flux_imaging::gateway::{GenerationResult, Mode, ResolvedParameters};
use flux_imaging::response::{base64, Delivery, MaterializedOutput};
use image::RgbImage;

fn native_fields(pairs: &[(&str, &str)]) -> FormFields {
    let mut fields = FormFields::default();
    for (name, value) in pairs {
        fields.insert_text(*name, *value);
    }
    fields
}

#[test]
fn test_native_request_reads_all_fields() {
    let mut fields = native_fields(&[
        ("prompt", "a red fox"),
        ("input_image_url", "https://example.com/fox.png"),
        ("bearer_token", "tok"),
        ("seed", "9"),
        ("width", "640"),
        ("height", "480"),
        ("guidance_scale", "0"),
        ("num_inference_steps", "12"),
    ]);
    fields.insert_file(
        "input_file",
        UploadedFile {
            file_name: Some("fox.png".to_string()),
            data: vec![1, 2, 3],
        },
    );

    let request = native_request(fields).unwrap();

    assert_eq!(request.prompt.as_deref(), Some("a red fox"));
    assert_eq!(request.image_bytes, Some(vec![1, 2, 3]));
    assert_eq!(request.image_url.as_deref(), Some("https://example.com/fox.png"));
    assert_eq!(request.bearer_token.as_deref(), Some("tok"));
    assert_eq!(request.seed, Some(9));
    assert_eq!(request.params.width, Some(640));
    assert_eq!(request.params.height, Some(480));
    assert_eq!(request.params.guidance_scale, Some(0.0));
    assert_eq!(request.params.num_inference_steps, Some(12));
}

#[test]
fn test_native_request_treats_empty_fields_as_absent() {
    let request = native_request(native_fields(&[("prompt", "hi"), ("seed", ""), ("width", "")])).unwrap();
    assert_eq!(request.seed, None);
    assert_eq!(request.params.width, None);
    assert_eq!(request.mode().unwrap(), Mode::Generate);
}

#[test]
fn test_native_request_rejects_bad_numbers() {
    let err = native_request(native_fields(&[("prompt", "hi"), ("seed", "-1")])).unwrap_err();
    assert!(matches!(err, AppError::InvalidRequest(_)));
}

#[test]
fn test_native_response_echoes_parameters() {
    let result = GenerationResult {
        image: RgbImage::new(1, 1),
        params: ResolvedParameters {
            mode: Mode::Variation,
            guidance_scale: 2.5,
            num_inference_steps: 8,
            width: 768,
            height: 512,
            seed: 123,
        },
        model: ModelInfo {
            base_model: "test/variation".to_string(),
            loras: vec![],
        },
        prior_model: Some("test/prior".to_string()),
    };

    let response = native_response(&result, MaterializedOutput::Base64("AAAA".to_string())).unwrap();
    let json = serde_json::to_value(&response).unwrap();

    assert_eq!(json["result_image_base64"], "AAAA");
    assert!(json.get("result_image_url").is_none());
    assert_eq!(json["seed"], 123);
    assert_eq!(json["mode"], "variation");
    assert_eq!(json["width"], 768);
    assert_eq!(json["model"]["prior_model"], "test/prior");
}

#[test]
fn test_parse_size() {
    assert_eq!(parse_size(None).unwrap(), None);
    assert_eq!(parse_size(Some("auto")).unwrap(), None);
    assert_eq!(parse_size(Some("512x768")).unwrap(), Some((512, 768)));
    assert!(parse_size(Some("512")).is_err());
    assert!(parse_size(Some("0x512")).is_err());
    assert!(parse_size(Some("big")).is_err());
}

#[test]
fn test_generations_ignores_image() {
    let request = OpenAiImageRequest {
        prompt: Some("a cat".to_string()),
        image: Some(vec![1, 2, 3]),
        ..Default::default()
    };
    let job = image_job(ImageEndpoint::Generations, request, &GenerationConfig::default()).unwrap();
    assert_eq!(job.request.image_bytes, None);
    assert_eq!(job.n, 1);
    assert_eq!(job.delivery, Delivery::External);
}

#[test]
fn test_variations_ignores_prompt() {
    let request = OpenAiImageRequest {
        prompt: Some("ignored".to_string()),
        image: Some(vec![1, 2, 3]),
        response_format: Some("b64_json".to_string()),
        ..Default::default()
    };
    let job = image_job(ImageEndpoint::Variations, request, &GenerationConfig::default()).unwrap();
    assert_eq!(job.request.prompt, None);
    assert_eq!(job.request.mode().unwrap(), Mode::Variation);
    assert_eq!(job.delivery, Delivery::Embedded);
}

#[test]
fn test_edits_without_prompt_is_rejected() {
    let request = OpenAiImageRequest {
        image: Some(vec![1, 2, 3]),
        ..Default::default()
    };
    let err = image_job(ImageEndpoint::Edits, request, &GenerationConfig::default()).unwrap_err();
    assert!(matches!(err, AppError::InvalidRequest(_)));
}

#[test]
fn test_batch_size_limits() {
    let request = |n| OpenAiImageRequest {
        prompt: Some("x".to_string()),
        n: Some(n),
        ..Default::default()
    };
    let config = GenerationConfig {
        max_images: 4,
        ..Default::default()
    };
    assert!(image_job(ImageEndpoint::Generations, request(0), &config).is_err());
    assert!(image_job(ImageEndpoint::Generations, request(5), &config).is_err());
    assert_eq!(image_job(ImageEndpoint::Generations, request(4), &config).unwrap().n, 4);
}

#[test]
fn test_absent_size_uses_canvas_on_every_endpoint() {
    let config = GenerationConfig::default();
    let edit = OpenAiImageRequest {
        prompt: Some("x".to_string()),
        image: Some(vec![1, 2, 3]),
        ..Default::default()
    };

    let job = image_job(ImageEndpoint::Edits, edit.clone(), &config).unwrap();
    assert_eq!(job.request.params.width, Some(1024));
    assert_eq!(job.request.params.height, Some(1024));

    let job = image_job(
        ImageEndpoint::Variations,
        OpenAiImageRequest {
            size: Some(String::new()),
            ..edit.clone()
        },
        &config,
    )
    .unwrap();
    assert_eq!((job.request.params.width, job.request.params.height), (Some(1024), Some(1024)));

    let job = image_job(
        ImageEndpoint::Edits,
        OpenAiImageRequest {
            size: Some("auto".to_string()),
            ..edit
        },
        &config,
    )
    .unwrap();
    assert_eq!((job.request.params.width, job.request.params.height), (None, None));
}

#[test]
fn test_unknown_response_format_is_rejected() {
    let request = OpenAiImageRequest {
        prompt: Some("x".to_string()),
        response_format: Some("file".to_string()),
        ..Default::default()
    };
    assert!(matches!(
        image_job(ImageEndpoint::Generations, request, &GenerationConfig::default()),
        Err(AppError::InvalidRequest(_))
    ));
}

#[test]
fn test_json_image_accepts_data_url() {
    let body: OpenAiJsonBody = serde_json::from_value(serde_json::json!({
        "prompt": "x",
        "image": format!("data:image/png;base64,{}", base64::encode(b"png")),
        "model": "dall-e-2"
    }))
    .unwrap();
    let request = OpenAiImageRequest::from_json(body).unwrap();
    assert_eq!(request.image, Some(b"png".to_vec()));
}

#[test]
fn test_json_image_rejects_garbage() {
    let body = OpenAiJsonBody {
        image: Some("%%%".to_string()),
        ..Default::default()
    };
    assert!(matches!(OpenAiImageRequest::from_json(body), Err(AppError::InvalidRequest(_))));
}
