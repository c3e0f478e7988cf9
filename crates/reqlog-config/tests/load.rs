use std::io::Write;

use reqlog_config::{LogCollectorConfig, LoggingConfig, load_from_path, load_from_str};
use reqlog_core::SamplingConfig;

const DOCUMENT: &str = r#"{
    "log_level": "debug",
    "log_format": "json",
    "deployment_tags": ["serve", "tpu"],
    "collector_queue_capacity": 128,
    "models": {
        "resnet": [
            {
                "sampling_config": {"sampling_rate": 0.25},
                "log_collector_config": {"type": "jsonl", "filename_prefix": "/var/log/resnet"}
            },
            {
                "sampling_config": {"sampling_rate": 1.0},
                "log_collector_config": {"type": "discard"}
            }
        ],
        "bert": []
    }
}"#;

#[test]
fn full_document_round_trips_into_typed_config() {
    let config = load_from_str(DOCUMENT).expect("document should load");
    assert_eq!(config.log_level, "debug");
    assert_eq!(config.log_format.as_deref(), Some("json"));
    assert_eq!(config.deployment_tags, vec!["serve", "tpu"]);
    assert_eq!(config.collector_queue_capacity.get(), 128);
    assert_eq!(config.models.len(), 2);
    assert!(config.models["bert"].is_empty());
    assert_eq!(
        config.models["resnet"][0],
        LoggingConfig {
            sampling_config: SamplingConfig::new(0.25),
            log_collector_config: LogCollectorConfig {
                collector_type: "jsonl".to_string(),
                filename_prefix: "/var/log/resnet".to_string(),
            },
        }
    );
    assert_eq!(
        config.models["resnet"][1].log_collector_config.filename_prefix,
        ""
    );
}

#[tokio::test]
async fn document_loads_from_disk() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    file.write_all(DOCUMENT.as_bytes()).expect("write document");

    let config = load_from_path(file.path())
        .await
        .expect("document should load");
    assert_eq!(config.models["resnet"].len(), 2);
}
