use super::{
    errors::{StateMachineError, StateMachineResult},
    events::StepEvent,
    states::StepState,
};
use crate::models::{AsyncKey, StepInstanceId};

/// A transition the machine accepted
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub from: StepState,
    pub to: StepState,
    pub event: StepEvent,
}

/// Lifecycle tracker for a single step instance.
///
/// Holds no locks of its own; the executor owns it inside the step's slot.
#[derive(Debug, Clone)]
pub struct StepStateMachine {
    step: StepInstanceId,
    state: StepState,
    awaiting: Option<AsyncKey>,
}

impl StepStateMachine {
    /// Create a new step state machine instance
    pub fn new(step: StepInstanceId) -> Self {
        Self {
            step,
            state: StepState::default(),
            awaiting: None,
        }
    }

    pub fn current_state(&self) -> StepState {
        self.state
    }

    /// Key the step is suspended on, if any
    pub fn awaiting(&self) -> Option<&AsyncKey> {
        self.awaiting.as_ref()
    }

    pub fn step(&self) -> &StepInstanceId {
        &self.step
    }

    /// Attempt to transition the step state
    pub fn transition(&mut self, event: StepEvent) -> StateMachineResult<Transition> {
        let from = self.state;
        let to = self.determine_target_state(from, &event)?;

        if let StepEvent::Resume(key) = &event {
            match &self.awaiting {
                Some(expected) if expected == key => {}
                Some(expected) => {
                    return Err(StateMachineError::KeyMismatch {
                        expected: expected.to_string(),
                        actual: key.to_string(),
                    })
                }
                None => {
                    return Err(StateMachineError::KeyMismatch {
                        expected: "<none>".to_string(),
                        actual: key.to_string(),
                    })
                }
            }
        }

        self.awaiting = match &event {
            StepEvent::Suspend(key) => Some(key.clone()),
            _ => None,
        };
        self.state = to;

        tracing::trace!(
            step_instance = %self.step,
            from = %from,
            to = %to,
            event = event.event_type(),
            "Step state transition"
        );

        Ok(Transition { from, to, event })
    }

    /// Determine the target state based on current state and event
    pub fn determine_target_state(
        &self,
        current_state: StepState,
        event: &StepEvent,
    ) -> StateMachineResult<StepState> {
        let target = match (current_state, event) {
            (StepState::Pending, StepEvent::Start) => StepState::InProgress,

            (StepState::InProgress, StepEvent::Complete) => StepState::Complete,
            (StepState::InProgress, StepEvent::Suspend(_)) => StepState::Suspended,
            (StepState::InProgress, StepEvent::Fail(_)) => StepState::Error,

            (StepState::Suspended, StepEvent::Resume(_)) => StepState::InProgress,

            (from_state, _) => {
                return Err(StateMachineError::InvalidTransition {
                    from: from_state.to_string(),
                    event: event.event_type().to_string(),
                })
            }
        };

        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::WorkflowInstanceId;

    fn machine() -> StepStateMachine {
        StepStateMachine::new(StepInstanceId::new(WorkflowInstanceId::new(), "s"))
    }

    #[test]
    fn test_happy_path_transitions() {
        let mut sm = machine();
        sm.transition(StepEvent::Start).unwrap();
        let t = sm.transition(StepEvent::Complete).unwrap();
        assert_eq!(t.from, StepState::InProgress);
        assert_eq!(t.to, StepState::Complete);
        assert!(sm.current_state().is_terminal());
    }

    #[test]
    fn test_suspend_and_resume_requires_matching_key() {
        let mut sm = machine();
        let key = AsyncKey::from("k1");
        sm.transition(StepEvent::Start).unwrap();
        sm.transition(StepEvent::Suspend(key.clone())).unwrap();
        assert_eq!(sm.awaiting(), Some(&key));

        let err = sm
            .transition(StepEvent::Resume(AsyncKey::from("other")))
            .unwrap_err();
        assert!(matches!(err, StateMachineError::KeyMismatch { .. }));
        assert_eq!(sm.current_state(), StepState::Suspended);

        sm.transition(StepEvent::Resume(key)).unwrap();
        assert_eq!(sm.current_state(), StepState::InProgress);
        assert!(sm.awaiting().is_none());
    }

    #[test]
    fn test_terminal_states_reject_events() {
        let mut sm = machine();
        sm.transition(StepEvent::Start).unwrap();
        sm.transition(StepEvent::fail_with_error("boom")).unwrap();

        let err = sm.transition(StepEvent::Start).unwrap_err();
        assert_eq!(
            err,
            StateMachineError::InvalidTransition {
                from: "error".to_string(),
                event: "start".to_string(),
            }
        );
    }

    #[test]
    fn test_resume_without_suspension_is_invalid() {
        let mut sm = machine();
        assert!(sm
            .transition(StepEvent::Resume(AsyncKey::from("k")))
            .is_err());
    }
}
