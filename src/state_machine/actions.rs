use super::step_state_machine::Transition;
use super::states::StepState;
use crate::constants::topics;
use crate::events::{NotificationBus, PublishReport};
use crate::models::StepInstanceId;
use chrono::Utc;
use serde_json::Value;

/// Publish the lifecycle notification for an accepted transition
pub fn publish_transition(
    bus: &NotificationBus,
    step: &StepInstanceId,
    transition: &Transition,
) -> Option<PublishReport> {
    let topic = determine_step_topic(transition.from, transition.to)?;
    Some(bus.publish(topic, build_step_event_context(step, transition)))
}

fn determine_step_topic(from_state: StepState, to_state: StepState) -> Option<&'static str> {
    match (from_state, to_state) {
        (StepState::Pending, StepState::InProgress) => Some(topics::STEP_STARTED),
        (StepState::Suspended, StepState::InProgress) => Some(topics::STEP_RESUMED),
        (_, StepState::Suspended) => Some(topics::STEP_SUSPENDED),
        (_, StepState::Complete) => Some(topics::STEP_COMPLETED),
        (_, StepState::Error) => Some(topics::STEP_FAILED),
        _ => None,
    }
}

fn build_step_event_context(step: &StepInstanceId, transition: &Transition) -> Value {
    serde_json::json!({
        "workflow_instance_id": step.workflow_instance_id,
        "step_name": step.step_name,
        "index": step.index,
        "from_state": transition.from,
        "to_state": transition.to,
        "event": transition.event,
        "transitioned_at": Utc::now(),
    })
}
