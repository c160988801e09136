use flowstate_core::config::{ConfigManager, ConfigurationError};
use flowstate_core::orchestration::{StepExecutor, WorkflowRuntime};
use flowstate_core::processor::{CollectingSink, PrefixProcessor, ProcessorStage};
use serde_json::json;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

fn write_config(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let dir = temp_dir.path().to_path_buf();
    fs::write(dir.join("flowstate-config.yml"), contents).unwrap();
    (temp_dir, dir)
}

#[test]
fn test_stage_built_from_loaded_configuration() {
    let (_guard, dir) = write_config(
        r#"
processors:
  prefixer:
    params:
      pfx: "P-"
test:
  processors:
    prefixer:
      supports_bulk: true
"#,
    );

    let manager = ConfigManager::load_from_directory_with_env(Some(dir), "test").unwrap();
    let stage_config = manager.stage_config("prefixer");
    let sink = Arc::new(CollectingSink::new());
    let stage = ProcessorStage::new(
        Arc::new(PrefixProcessor::from_config("prefixer", &stage_config).unwrap()),
        sink.clone(),
        &stage_config,
    );

    assert!(stage.supports_bulk());
    stage.submit(json!({"a": 1})).unwrap();
    assert_eq!(sink.records(), vec![json!({"P-a": 1})]);
}

#[test]
fn test_runtime_takes_limits_from_configuration() {
    let (_guard, dir) = write_config(
        "execution:\n  max_concurrent_steps: 3\nnotifications:\n  slow_handler_threshold_ms: 5\n",
    );
    let manager = ConfigManager::load_from_directory_with_env(Some(dir), "production").unwrap();
    let runtime = Arc::new(WorkflowRuntime::from_config_manager(&manager));

    assert_eq!(runtime.config().execution.max_concurrent_steps, 3);
    assert_eq!(runtime.config().execution.environment, "production");
    StepExecutor::new(runtime);
}

#[test]
fn test_missing_directory_reports_searched_paths() {
    let temp_dir = TempDir::new().unwrap();
    let missing = temp_dir.path().join("nope");
    match ConfigManager::load_from_directory_with_env(Some(missing), "test") {
        Err(ConfigurationError::ConfigFileNotFound { searched_paths }) => {
            assert_eq!(searched_paths.len(), 2);
        }
        other => panic!("expected ConfigFileNotFound, got {:?}", other.map(|_| ())),
    }
}
