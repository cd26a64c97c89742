use ecfr_core::traits::Embedder;
use ecfr_core::PipelineConfig;
use ecfr_embed::{load_embedder, FakeEmbedder, FAKE_DIM};

fn norm(v: &[f32]) -> f32 { v.iter().map(|x| x * x).sum::<f32>().sqrt() }

#[test]
fn fake_embedder_shapes_and_determinism() {
    let embedder = FakeEmbedder::default();
    let texts = vec!["hello world".to_string(), "hello world".to_string(), "other words".to_string()];
    let embs = embedder.embed_batch(&texts).expect("embed_batch");
    assert_eq!(embs.len(), 3);
    assert_eq!(embs[0].len(), FAKE_DIM);
    assert!((norm(&embs[0]) - 1.0).abs() <= 1e-3, "vector is L2-normalized");
    assert_eq!(embs[0], embs[1]);
    assert_ne!(embs[0], embs[2]);
}

#[test]
fn fake_embedder_ignores_case_and_punctuation() {
    let embedder = FakeEmbedder::new(64);
    let embs = embedder
        .embed_batch(&["Incorporation by reference.".to_string(), "incorporation BY reference".to_string()])
        .unwrap();
    assert_eq!(embs[0], embs[1]);
    assert_eq!(embedder.model_name(), "fake-xxhash-64");
}

#[test]
fn empty_batch_is_empty_matrix() {
    let embs = FakeEmbedder::default().embed_batch(&[]).unwrap();
    assert!(embs.is_empty());
}

#[test]
fn config_flag_selects_fake_embedder() {
    let cfg = PipelineConfig { use_fake_embeddings: true, ..PipelineConfig::default() };
    let embedder = load_embedder(&cfg, None).expect("embedder");
    assert_eq!(embedder.dim(), FAKE_DIM);
    assert!(embedder.model_name().starts_with("fake-"));
}

#[test]
fn missing_model_dir_is_an_error() {
    if std::env::var("APP_USE_FAKE_EMBEDDINGS").is_ok() {
        return;
    }
    let tmp = tempfile::tempdir().unwrap();
    let cfg = PipelineConfig {
        model_dir: Some(tmp.path().join("nope").to_string_lossy().to_string()),
        models_root: tmp.path().to_string_lossy().to_string(),
        model_name: "no-such-model".into(),
        ..PipelineConfig::default()
    };
    assert!(load_embedder(&cfg, None).is_err());
}
