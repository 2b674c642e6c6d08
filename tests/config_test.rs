use kds_rs::config::Config;
use std::time::Duration;

const VARS: [&str; 5] = [
    "KDS_PRINTER_ADDR",
    "KDS_HTTP_ADDR",
    "KDS_DATA_DIR",
    "KDS_MAX_PAYLOAD_BYTES",
    "KDS_READ_TIMEOUT_SECS",
];

// One test: env vars are process-global and tests run in parallel.
#[test]
fn config_from_env_defaults_overrides_and_rejects_garbage() {
    unsafe {
        for var in VARS {
            std::env::remove_var(var);
        }
    }

    let config = Config::from_env().unwrap();
    assert_eq!(config.printer_addr.port(), 9999);
    assert_eq!(config.http_addr.port(), 5000);
    assert_eq!(config.max_payload_bytes, 16 * 1024);
    assert_eq!(config.read_timeout, Duration::from_secs(5));
    assert!(!config.log_level.is_empty());

    unsafe {
        std::env::set_var("KDS_PRINTER_ADDR", "127.0.0.1:9100");
        std::env::set_var("KDS_DATA_DIR", "/var/lib/kds");
        std::env::set_var("KDS_READ_TIMEOUT_SECS", "2");
    }
    let config = Config::from_env().unwrap();
    assert_eq!(config.printer_addr, "127.0.0.1:9100".parse().unwrap());
    assert_eq!(config.data_dir, std::path::PathBuf::from("/var/lib/kds"));
    assert_eq!(config.read_timeout, Duration::from_secs(2));

    unsafe {
        std::env::set_var("KDS_MAX_PAYLOAD_BYTES", "lots");
    }
    let err = Config::from_env().unwrap_err();
    assert!(err.to_string().contains("KDS_MAX_PAYLOAD_BYTES"));

    unsafe {
        for var in VARS {
            std::env::remove_var(var);
        }
    }
}
