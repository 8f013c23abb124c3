use super::*;
use serial_test::serial;

fn with_state_dir<R>(f: impl FnOnce(&std::path::Path) -> R) -> R {
    let dir = tempfile::tempdir().expect("tempdir");
    // SAFETY: serialized via #[serial] below; no other test reads BP_STATE_DIR concurrently.
    unsafe { std::env::set_var("BP_STATE_DIR", dir.path()) };
    let result = f(dir.path());
    unsafe { std::env::remove_var("BP_STATE_DIR") };
    result
}

#[test]
#[serial]
fn load_resolves_bp_state_dir_and_creates_uploads() {
    with_state_dir(|dir| {
        let config = Config::load().expect("load");
        assert_eq!(config.state_dir, dir);
        assert!(config.uploads_dir.is_dir());
        assert_eq!(config.db_path, dir.join("blueprint.db"));
        assert_eq!(config.log_path, dir.join("daemon.log"));
        assert_eq!(config.lock_path, dir.join("daemon.lock"));
    });
}

#[test]
#[serial]
fn token_is_minted_once_and_reused() {
    with_state_dir(|_dir| {
        let config = Config::load().expect("load");
        let first = config.load_or_create_token().expect("mint token");
        assert_eq!(first.len(), 32);
        let second = config.load_or_create_token().expect("reread token");
        assert_eq!(first, second);
    });
}

#[test]
#[serial]
fn base_url_combines_bind_addr_and_port() {
    with_state_dir(|_dir| {
        let config = Config::load().expect("load");
        assert_eq!(config.base_url(), format!("http://127.0.0.1:{}", config.port));
    });
}
