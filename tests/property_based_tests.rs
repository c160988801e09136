mod common;

use common::strategies::*;
use flowstate_core::async_completion::AsyncCompletionRegistry;
use flowstate_core::config::StageConfig;
use flowstate_core::models::{StepData, StepInstanceId, WorkflowInstanceId};
use flowstate_core::processor::{CollectingSink, PrefixProcessor, ProcessorStage};
use flowstate_core::step_data::StepDataStore;
use proptest::prelude::*;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;

proptest! {
    /// Property: the stored data equals the left fold of the deltas under
    /// last-writer-wins key union
    #[test]
    fn merge_sequence_equals_fold(deltas in delta_sequence_strategy()) {
        let store = StepDataStore::new();
        let step = StepInstanceId::new(WorkflowInstanceId::new(), "fold");
        store.initialize(&step, StepData::new());

        let mut expected = serde_json::Map::new();
        for delta in &deltas {
            for (key, value) in delta {
                expected.insert(key.clone(), value.clone());
            }
            store.merge(&step, delta.iter().cloned().collect()).unwrap();
        }

        prop_assert_eq!(store.read(&step).unwrap(), StepData::from(expected));
    }

    /// Property: merges never remove keys
    #[test]
    fn merge_never_removes_keys(deltas in delta_sequence_strategy()) {
        let store = StepDataStore::new();
        let step = StepInstanceId::new(WorkflowInstanceId::new(), "monotonic");
        store.initialize(&step, StepData::new());

        let mut previous: HashSet<String> = HashSet::new();
        for delta in deltas {
            let keys: HashSet<String> = store
                .merge(&step, delta.into_iter().collect())
                .unwrap()
                .keys()
                .cloned()
                .collect();
            prop_assert!(previous.is_subset(&keys));
            previous = keys;
        }
    }

    /// Property: every issued key is distinct
    #[test]
    fn issued_keys_are_distinct(count in 1usize..200) {
        let registry = AsyncCompletionRegistry::new();
        let step = StepInstanceId::new(WorkflowInstanceId::new(), "issuer");
        let keys: HashSet<_> = (0..count).map(|_| registry.issue(&step)).collect();
        prop_assert_eq!(keys.len(), count);
    }

    /// Property: bulk and per-record submission forward the same records
    #[test]
    fn bulk_and_single_paths_agree(batch in prop::collection::vec(object_record_strategy(), 0..10)) {
        let run = |bulk: bool, batch: Vec<Value>| {
            let sink = Arc::new(CollectingSink::new());
            let config = StageConfig::default()
                .with_param("pfx", serde_json::json!("P-"))
                .with_bulk(bulk);
            let stage = ProcessorStage::new(
                Arc::new(PrefixProcessor::from_config("prefixer", &config).unwrap()),
                sink.clone(),
                &config,
            );
            stage.submit_batch(batch);
            sink.records()
        };

        prop_assert_eq!(run(true, batch.clone()), run(false, batch));
    }
}
