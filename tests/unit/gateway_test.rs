//! Unit tests for mode resolution, parameter defaults, seeds and orchestration

#[path = "../common/mod.rs"]
mod common;

use common::{png_bytes, Fakes};
use flux_imaging::error::AppError;
use flux_imaging::gateway::{
    derive_seed, resolve_mode, resolve_params, GenerationRequest, Mode, ParameterDefaults, PartialParams,
};

#[test]
fn test_mode_truth_table() {
    assert_eq!(resolve_mode(true, true), Some(Mode::Edit));
    assert_eq!(resolve_mode(true, false), Some(Mode::Variation));
    assert_eq!(resolve_mode(false, true), Some(Mode::Generate));
    assert_eq!(resolve_mode(false, false), None);
}

#[test]
fn test_generate_defaults_to_canvas() {
    let params = resolve_params(Mode::Generate, &PartialParams::default(), None, 7, &ParameterDefaults::default());
    assert_eq!((params.width, params.height), (1024, 1024));
    assert_eq!(params.guidance_scale, 3.5);
    assert_eq!(params.num_inference_steps, 8);
    assert_eq!(params.seed, 7);
}

#[test]
fn test_edit_defaults_to_source_size_per_field() {
    let defaults = ParameterDefaults::default();
    let params = resolve_params(Mode::Edit, &PartialParams::default(), Some((768, 512)), 1, &defaults);
    assert_eq!((params.width, params.height), (768, 512));
    assert_eq!(params.guidance_scale, 2.5);

    let partial = PartialParams {
        width: Some(640),
        ..Default::default()
    };
    let params = resolve_params(Mode::Variation, &partial, Some((768, 512)), 1, &defaults);
    assert_eq!((params.width, params.height), (640, 512));
}

#[test]
fn test_explicit_zero_guidance_is_kept() {
    let partial = PartialParams {
        guidance_scale: Some(0.0),
        num_inference_steps: Some(0),
        ..Default::default()
    };
    let params = resolve_params(Mode::Generate, &partial, None, 1, &ParameterDefaults::default());
    assert_eq!(params.guidance_scale, 0.0);
    assert_eq!(params.num_inference_steps, 0);
}

#[test]
fn test_seed_sequence_for_batch() {
    let seeds: Vec<u64> = (0..3).map(|i| derive_seed(Some(100), i).seed()).collect();
    assert_eq!(seeds, vec![100, 101, 102]);
}

#[test]
fn test_random_seeds_differ() {
    let first = derive_seed(None, 0).seed();
    let second = derive_seed(None, 1).seed();
    assert_ne!(first, second);
}

#[tokio::test]
async fn test_generate_batch_records_consecutive_seeds() {
    let fakes = Fakes::new();
    let orchestrator = fakes.orchestrator();
    let request = GenerationRequest {
        prompt: Some("a lighthouse".to_string()),
        seed: Some(100),
        ..Default::default()
    };

    let prepared = orchestrator.prepare(&request).await.unwrap();
    for index in 0..3 {
        let result = orchestrator.generate(&prepared, index).await.unwrap();
        assert_eq!(result.mode(), Mode::Generate);
    }

    assert_eq!(fakes.generate.seeds(), vec![100, 101, 102]);
    let call = &fakes.generate.calls()[0];
    assert_eq!((call.width, call.height), (1024, 1024));
    assert_eq!(call.prompt.as_deref(), Some("a lighthouse"));
    assert!(fakes.edit.calls().is_empty());
}

#[tokio::test]
async fn test_edit_uses_source_dimensions() {
    let fakes = Fakes::new();
    let request = GenerationRequest {
        image_bytes: Some(png_bytes(768, 512)),
        prompt: Some("make it night".to_string()),
        seed: Some(5),
        ..Default::default()
    };

    let result = fakes.orchestrator().run(&request).await.unwrap();

    assert_eq!(result.mode(), Mode::Edit);
    assert_eq!((result.params.width, result.params.height), (768, 512));
    let calls = fakes.edit.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].source_dimensions, Some((768, 512)));
    assert_eq!(calls[0].seed, 5);
}

#[tokio::test]
async fn test_variation_runs_prior_then_conditioned_render() {
    let fakes = Fakes::new();
    let request = GenerationRequest {
        image_bytes: Some(png_bytes(32, 16)),
        ..Default::default()
    };

    let result = fakes.orchestrator().run(&request).await.unwrap();

    assert_eq!(result.mode(), Mode::Variation);
    assert_eq!(result.prior_model.as_deref(), Some("test/prior"));
    assert_eq!(fakes.prior.calls(), vec![(32, 16)]);
    let calls = fakes.variation.calls();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].conditioned);
    assert_eq!(calls[0].prompt, None);
    assert_eq!(calls[0].source_dimensions, None);
    assert_eq!((calls[0].width, calls[0].height), (32, 16));
}

#[tokio::test]
async fn test_request_without_inputs_is_rejected() {
    let fakes = Fakes::new();
    let request = GenerationRequest {
        prompt: Some(String::new()),
        ..Default::default()
    };
    let err = fakes.orchestrator().run(&request).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidRequest(_)));
}

#[tokio::test]
async fn test_zero_width_is_rejected() {
    let fakes = Fakes::new();
    let request = GenerationRequest {
        prompt: Some("x".to_string()),
        params: PartialParams {
            width: Some(0),
            ..Default::default()
        },
        ..Default::default()
    };
    let err = fakes.orchestrator().run(&request).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidRequest(_)));
    assert!(fakes.generate.calls().is_empty());
}

#[tokio::test]
async fn test_undecodable_upload_is_invalid_image() {
    let fakes = Fakes::new();
    let request = GenerationRequest {
        image_bytes: Some(b"not an image".to_vec()),
        prompt: Some("x".to_string()),
        ..Default::default()
    };
    let err = fakes.orchestrator().run(&request).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidImage(_)));
}
