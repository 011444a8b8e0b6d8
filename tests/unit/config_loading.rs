use quorum_sync::infrastructure::config::load_config_from_file;
use std::io::Write;
use tempfile::TempDir;

fn write_config(dir: &TempDir, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join("quorum-config.toml");
    let mut file = std::fs::File::create(&path).expect("create config file");
    file.write_all(contents.as_bytes()).expect("write config file");
    path
}

#[test]
fn loads_session_and_runtime_from_toml() {
    let dir = TempDir::new().expect("temp dir");
    let path = write_config(
        &dir,
        r#"
[session]
chain_id = 5
wallet_address = "0x00000000000000000000000000000000000000ee"
account_address = "0x0000000000000000000000000000000000000001"

[runtime]
resubscribe_interval_ms = 100
"#,
    );

    let config = load_config_from_file(&path).expect("load config");
    assert_eq!(config.session.chain_id, 5);
    assert_eq!(config.runtime.resubscribe_interval_ms, 100);

    let pair = config.session.validate().expect("validate pair");
    assert_eq!(pair.chain.value(), 5);
}

#[test]
fn rejects_malformed_wallet_address() {
    let dir = TempDir::new().expect("temp dir");
    let path = write_config(
        &dir,
        r#"
[session]
chain_id = 5
wallet_address = "0x1234"
account_address = "0x0000000000000000000000000000000000000001"
"#,
    );

    assert!(load_config_from_file(&path).is_err());
}

#[test]
fn rejects_unsupported_chain() {
    let dir = TempDir::new().expect("temp dir");
    let path = write_config(
        &dir,
        r#"
[session]
chain_id = 5
wallet_address = "0x00000000000000000000000000000000000000ee"
account_address = "0x0000000000000000000000000000000000000001"
supported_chain_ids = [1, 10]
"#,
    );

    assert!(load_config_from_file(&path).is_err());
}
