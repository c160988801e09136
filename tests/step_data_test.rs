mod common;

use common::*;
use flowstate_core::error::StepError;
use flowstate_core::models::StepData;
use flowstate_core::orchestration::{StepContext, WorkflowRuntime};
use flowstate_core::step_data;
use serde_json::json;
use std::sync::Arc;
use std::thread;

#[test]
fn test_step_data_updates_through_context() {
    let runtime = Arc::new(WorkflowRuntime::default());
    let wf = runtime.start_workflow_instance(StepData::new());
    let step = flowstate_core::models::StepInstanceId::new(wf, "java_user_interaction");
    runtime
        .step_data()
        .initialize(&step, step_data!({"test": "default"}));

    let ctx = StepContext::new(Arc::clone(&runtime), step.clone());
    ctx.update_step_data(step_data!({"test1": "test1"})).unwrap();
    ctx.update_step_data(step_data!({"test2": "test2"})).unwrap();
    let result = ctx
        .update_step_data(step_data!({"test1": "OVERWRITTEN"}))
        .unwrap();

    let expected = step_data!({"test": "default", "test1": "OVERWRITTEN", "test2": "test2"});
    assert_eq!(result, expected);
    assert_eq!(ctx.step_data().unwrap(), expected);
    assert_eq!(
        runtime.step_data().snapshot_for_external_view(&step).unwrap(),
        expected
    );
}

#[test]
fn test_context_for_unstarted_step_reports_not_found() {
    let runtime = Arc::new(WorkflowRuntime::default());
    let wf = runtime.start_workflow_instance(StepData::new());
    let ctx = StepContext::new(
        Arc::clone(&runtime),
        flowstate_core::models::StepInstanceId::new(wf, "never_started"),
    );

    assert!(matches!(ctx.step_data(), Err(StepError::StepData(_))));
    assert!(matches!(
        ctx.update_step_data(step_data!({"a": 1})),
        Err(StepError::StepData(_))
    ));
}

#[test]
fn test_external_readers_never_see_partial_merges() {
    let (executor, ids) = executor_with_workflow();
    let runtime = Arc::clone(executor.runtime());
    let step = ids.step("writer");
    runtime
        .step_data()
        .initialize(&step, step_data!({"a": 0, "b": 0}));

    let writer = {
        let runtime = Arc::clone(&runtime);
        let step = step.clone();
        thread::spawn(move || {
            for i in 1..=500 {
                runtime
                    .step_data()
                    .merge(&step, step_data!({"a": i, "b": i}))
                    .unwrap();
            }
        })
    };

    // every merge writes a and b together, so a snapshot always has a == b
    for _ in 0..500 {
        let snapshot = runtime.step_data().snapshot_for_external_view(&step).unwrap();
        assert_eq!(snapshot.get("a"), snapshot.get("b"));
    }
    writer.join().unwrap();

    assert_eq!(
        runtime.step_data().read(&step).unwrap(),
        step_data!({"a": 500, "b": 500})
    );
}

#[test]
fn test_dynamic_data_merges_from_many_threads() {
    let runtime = Arc::new(WorkflowRuntime::default());
    let wf = runtime.start_workflow_instance(StepData::new());

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let runtime = Arc::clone(&runtime);
            thread::spawn(move || {
                let mut delta = StepData::new();
                delta.insert(format!("thread_{t}"), json!(t));
                runtime.dynamic_data().merge(&wf, delta).unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(runtime.dynamic_data().read(&wf).unwrap().len(), 8);
}
