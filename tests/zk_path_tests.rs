use kshell::zk::resolve_path;

#[test]
fn relative_keys_resolve_against_the_session_cwd() {
    assert_eq!(resolve_path("/brokers", "ids"), "/brokers/ids");
    assert_eq!(resolve_path("/brokers/ids", ".."), "/brokers");
    assert_eq!(resolve_path("/brokers/ids", "/consumers"), "/consumers");
}

#[test]
fn walking_above_root_stays_at_root() {
    let mut cwd = "/a/b".to_string();
    for _ in 0..5 {
        cwd = resolve_path(&cwd, "..");
    }
    assert_eq!(cwd, "/");
}
