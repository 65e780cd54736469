use super::*;

#[test]
fn test_queue_section_defaults() {
    let section = QueueSection::default();
    assert_eq!(section.name, "default");
    assert_eq!(section.autoclean_interval_secs, 60.0);
    assert_eq!(section.codec, CodecKind::Raw);
    assert_eq!(section.autoclean_interval(), Some(Duration::from_secs(60)));
}

#[test]
fn test_autoclean_interval_disabled() {
    let mut section = QueueSection::default();
    section.autoclean_interval_secs = 0.0;
    assert_eq!(section.autoclean_interval(), None);
    section.autoclean_interval_secs = -3.0;
    assert_eq!(section.autoclean_interval(), None);
    section.autoclean_interval_secs = 0.25;
    assert_eq!(section.autoclean_interval(), Some(Duration::from_millis(250)));
}

#[test]
fn test_autoclean_interval_out_of_range() {
    let mut section = QueueSection::default();
    section.autoclean_interval_secs = 1e30;
    assert_eq!(section.autoclean_interval(), None);
    section.autoclean_interval_secs = f64::INFINITY;
    assert_eq!(section.autoclean_interval(), None);
}

#[test]
fn test_backend_section_defaults() {
    let section = BackendSection::default();
    assert_eq!(section.kind, BackendKind::Sqlite);
    assert!(section.path.ends_with("queue.db"));
    assert_eq!(section.poll_interval(), Duration::from_millis(250));
    assert!(section.options.is_empty());
}

#[test]
fn test_memory_backend_is_opt_in() {
    let config: Config = toml::from_str("[backend]\nkind = \"memory\"").unwrap();
    assert_eq!(config.backend.kind, BackendKind::Memory);
}

#[test]
fn test_partial_section_fills_defaults() {
    let config: Config = toml::from_str("[queue]\ncodec = \"text\"").unwrap();
    assert_eq!(config.queue.name, "default");
    assert_eq!(config.queue.codec, CodecKind::Text);
    assert_eq!(config.backend.kind, BackendKind::Sqlite);
}

#[test]
fn test_option_strings() {
    let config: Config = toml::from_str(
        r#"
        [backend.options]
        journal_mode = "WAL"
        cache_size = -2000
        foreign_keys = true
        "#,
    )
    .unwrap();

    let options = config.backend.option_strings();
    assert_eq!(options["journal_mode"], "WAL");
    assert_eq!(options["cache_size"], "-2000");
    assert_eq!(options["foreign_keys"], "true");
}

#[test]
fn test_kind_serialization() {
    let rendered = toml::to_string(&Config::default()).unwrap();
    assert!(rendered.contains("kind = \"sqlite\""));
    assert!(rendered.contains("codec = \"raw\""));
}
