#![allow(dead_code)]

use proptest::prelude::*;
use serde_json::{json, Value};

/// Strategy for step data keys; a small alphabet so deltas overlap often
pub fn step_data_key_strategy() -> impl Strategy<Value = String> {
    "[a-e]{1,2}"
}

/// Strategy for scalar JSON values stored in step data
pub fn scalar_value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<i64>().prop_map(|n| json!(n)),
        any::<bool>().prop_map(|b| json!(b)),
        "[a-zA-Z0-9 ]{0,12}".prop_map(|s| json!(s)),
        Just(Value::Null),
    ]
}

/// Strategy for one merge delta
pub fn delta_strategy() -> impl Strategy<Value = Vec<(String, Value)>> {
    prop::collection::vec((step_data_key_strategy(), scalar_value_strategy()), 0..6)
}

/// Strategy for a sequence of merge deltas
pub fn delta_sequence_strategy() -> impl Strategy<Value = Vec<Vec<(String, Value)>>> {
    prop::collection::vec(delta_strategy(), 0..12)
}

/// Strategy for object records fed to processor stages
pub fn object_record_strategy() -> impl Strategy<Value = Value> {
    prop::collection::btree_map("[a-z]{1,6}", scalar_value_strategy(), 0..5)
        .prop_map(|map| Value::Object(map.into_iter().collect()))
}
