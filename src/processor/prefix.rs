use super::traits::{Processor, RecordEmitter};
use crate::config::StageConfig;
use crate::constants::processor_params;
use crate::error::{ProcessorError, ProcessorResult};
use serde_json::{json, Map, Value};
use std::sync::atomic::{AtomicBool, Ordering};

/// Renames every key of an object record to `prefix + key`.
///
/// Parameters:
/// - `pfx` (required): prefix prepended verbatim
/// - `raise_error`: the first submission fails, later ones succeed
/// - `default_record`: replaces a null input record
/// - `crec`: object merged unprefixed into every output
/// - `supports_bulk`: advertise bulk capability
#[derive(Debug)]
pub struct PrefixProcessor {
    name: String,
    prefix: String,
    raise_error: AtomicBool,
    default_record: Map<String, Value>,
    constant_record: Map<String, Value>,
    supports_bulk: bool,
}

impl PrefixProcessor {
    pub fn new(name: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            prefix: prefix.into(),
            raise_error: AtomicBool::new(false),
            default_record: Self::builtin_default_record(),
            constant_record: Map::new(),
            supports_bulk: false,
        }
    }

    pub fn from_config(name: impl Into<String>, config: &StageConfig) -> ProcessorResult<Self> {
        let name = name.into();
        let prefix = config
            .param_str(processor_params::PREFIX)
            .ok_or_else(|| ProcessorError::InvalidConfiguration {
                stage: name.clone(),
                reason: format!("missing string parameter '{}'", processor_params::PREFIX),
            })?
            .to_string();

        let default_record = Self::object_param(&name, config, processor_params::DEFAULT_RECORD)?
            .unwrap_or_else(Self::builtin_default_record);
        let constant_record = Self::object_param(&name, config, processor_params::CONSTANT_RECORD)?
            .unwrap_or_default();

        Ok(Self {
            prefix,
            raise_error: AtomicBool::new(
                config
                    .param_bool(processor_params::RAISE_ERROR)
                    .unwrap_or(false),
            ),
            default_record,
            constant_record,
            supports_bulk: config
                .param_bool(processor_params::SUPPORTS_BULK)
                .unwrap_or(false),
            name,
        })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    fn builtin_default_record() -> Map<String, Value> {
        match json!({"test1": "one", "test2": "two"}) {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    fn object_param(
        stage: &str,
        config: &StageConfig,
        param: &str,
    ) -> ProcessorResult<Option<Map<String, Value>>> {
        match config.param(param) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Object(map)) => Ok(Some(map.clone())),
            Some(other) => Err(ProcessorError::InvalidConfiguration {
                stage: stage.to_string(),
                reason: format!("parameter '{param}' must be an object, got {other}"),
            }),
        }
    }
}

impl Processor for PrefixProcessor {
    fn name(&self) -> &str {
        &self.name
    }

    fn submit(&self, record: Value, out: &mut RecordEmitter) -> ProcessorResult<()> {
        if self.raise_error.swap(false, Ordering::AcqRel) {
            return Err(ProcessorError::record_failed(
                &self.name,
                "raise_error requested a failure",
            ));
        }

        let fields = match record {
            Value::Null => self.default_record.clone(),
            Value::Object(map) => map,
            other => {
                return Err(ProcessorError::record_failed(
                    &self.name,
                    format!("expected an object record, got {other}"),
                ))
            }
        };

        let mut output: Map<String, Value> = fields
            .into_iter()
            .map(|(key, value)| (format!("{}{}", self.prefix, key), value))
            .collect();
        for (key, value) in &self.constant_record {
            output.insert(key.clone(), value.clone());
        }

        out.emit(Value::Object(output));
        Ok(())
    }

    fn supports_bulk(&self) -> bool {
        self.supports_bulk
    }
}
