use kshell::config::Config;

#[test]
fn default_config_is_sane() {
    let cfg = Config::load("/nonexistent/path/config.properties");
    assert_eq!(cfg.zk_connect(), "localhost:2181");
    assert_eq!(cfg.seed_brokers(), vec!["localhost:9092".to_string()]);
    assert_eq!(cfg.zk_session_timeout_ms(), 6000);
    assert_eq!(cfg.scan_threads(), None);
}

#[test]
fn file_values_override_defaults() {
    let dir = std::env::temp_dir().join(format!("kshell-integration-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("config.properties");
    std::fs::write(
        &path,
        "# comment\nzookeeper.connect=zk1:2181,zk2:2181\nkafka.brokers=b1:9092, b2:9092\nscan.threads=4\n",
    )
    .unwrap();

    let cfg = Config::load(&path);
    assert_eq!(cfg.zk_connect(), "zk1:2181,zk2:2181");
    assert_eq!(cfg.seed_brokers(), vec!["b1:9092".to_string(), "b2:9092".to_string()]);
    assert_eq!(cfg.scan_threads(), Some(4));

    std::fs::remove_dir_all(&dir).ok();
}
