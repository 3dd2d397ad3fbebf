use std::path::PathBuf;

use seqsum_config::{DEFAULT_MODULE_PATH, SeqsumConfig};

#[test]
fn test_parse_and_validate() {
    let config = SeqsumConfig::load("tests/fixtures/basic.yaml").unwrap();
    assert_eq!(config.module.path, PathBuf::from("build/sum.wasm"));
    assert_eq!(config.limits.max_memory_bytes, 1048576);
    assert_eq!(config.limits.max_sequence_len, 1000);
    assert_eq!(config.limits.fuel, Some(5000000));

    let fixtures = PathBuf::from("tests/fixtures").canonicalize().unwrap();
    assert_eq!(config.get_module_path(), fixtures.join("build/sum.wasm"));
}

#[test]
fn test_defaults() {
    let config = SeqsumConfig::load("tests/fixtures/defaults.yaml").unwrap();
    assert_eq!(config.module.path, PathBuf::from(DEFAULT_MODULE_PATH));
    assert_eq!(config.limits.fuel, None);
}

#[test]
fn test_tiny_memory() {
    let err = SeqsumConfig::load("tests/fixtures/tiny_memory.yaml").unwrap_err();
    assert_eq!(err, "max_memory_bytes must be at least 65536 (one Wasm page)");
}

#[test]
fn test_missing_file() {
    let err = SeqsumConfig::load("tests/fixtures/does_not_exist.yaml").unwrap_err();
    assert!(err.starts_with("Failed to open file"), "{err}");
}

#[test]
fn test_absolute_module_path() {
    let td = tempfile::tempdir().unwrap();
    let module = td.path().join("elsewhere").join("sum.wasm");
    let cfg_path = td.path().join("seqsum.yaml");
    std::fs::write(
        &cfg_path,
        format!("module:\n  path: \"{}\"\n", module.display()),
    )
    .unwrap();

    let config = SeqsumConfig::load(&cfg_path).unwrap();
    assert_eq!(config.get_module_path(), module);
}
