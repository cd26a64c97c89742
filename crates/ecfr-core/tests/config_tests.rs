use ecfr_core::{Config, Error, PipelineConfig};
use figment::providers::{Format, Toml};
use figment::Figment;

#[test]
fn defaults_are_valid() {
    let cfg = PipelineConfig::default();
    cfg.validate().expect("defaults validate");
    assert_eq!(cfg.chunk_size, 512);
    assert_eq!(cfg.chunk_overlap, 128);
    assert_eq!(cfg.model_name, "all-MiniLM-L6-v2");
    assert_eq!(cfg.top_k_default, 5);
}

#[test]
fn toml_overrides_layer_over_defaults() {
    let cfg = Config::from_figment(Figment::from(Toml::string(
        "chunk_size = 256\nchunk_overlap = 64\noutput_root = \"/tmp/out\"\n",
    )));
    let pipeline = cfg.pipeline().expect("pipeline");
    assert_eq!(pipeline.chunk_size, 256);
    assert_eq!(pipeline.chunk_overlap, 64);
    assert_eq!(pipeline.output_root_path(), std::path::PathBuf::from("/tmp/out"));
    assert_eq!(pipeline.model_name, "all-MiniLM-L6-v2");
    assert_eq!(cfg.get::<usize>("top_k_default").unwrap(), 5);
}

#[test]
fn overlap_not_below_size_is_rejected() {
    let cfg = Config::from_figment(Figment::from(Toml::string("chunk_size = 100\nchunk_overlap = 100\n")));
    assert!(matches!(cfg.pipeline(), Err(Error::InvalidConfig(_))));
}

#[test]
fn zero_top_k_is_rejected() {
    let cfg = PipelineConfig { top_k_default: 0, ..PipelineConfig::default() };
    assert!(matches!(cfg.validate(), Err(Error::InvalidConfig(_))));
}

#[test]
fn model_dir_defaults_under_models_root() {
    let cfg = PipelineConfig { models_root: "/opt/models".into(), ..PipelineConfig::default() };
    assert_eq!(cfg.model_dir_path(), std::path::PathBuf::from("/opt/models/all-MiniLM-L6-v2"));
    let explicit = PipelineConfig { model_dir: Some("/m".into()), ..cfg };
    assert_eq!(explicit.model_dir_path(), std::path::PathBuf::from("/m"));
}

#[test]
fn load_from_reads_config_toml() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::write(tmp.path().join("config.toml"), "chunk_size = 300\nchunk_overlap = 30\n").unwrap();
    let cfg = Config::load_from(tmp.path()).expect("load");
    let pipeline = cfg.pipeline().unwrap();
    assert_eq!(pipeline.chunk_size, 300);
    assert_eq!(pipeline.chunk_overlap, 30);
}

#[test]
fn fake_embedding_flag_accepts_numbers_and_strings() {
    for raw in ["use_fake_embeddings = 1", "use_fake_embeddings = \"true\"", "use_fake_embeddings = true"] {
        let cfg = Config::from_figment(Figment::from(Toml::string(raw))).pipeline().unwrap();
        assert!(cfg.use_fake_embeddings, "{}", raw);
    }
    let cfg = Config::from_figment(Figment::from(Toml::string("use_fake_embeddings = 0"))).pipeline().unwrap();
    assert!(!cfg.use_fake_embeddings);
}
