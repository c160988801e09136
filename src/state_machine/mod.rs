// State machine module for step lifecycle tracking
//
// The executor drives one StepStateMachine per step instance; every accepted
// transition is published on the notification bus by the actions module.

pub mod actions;
pub mod errors;
pub mod events;
pub mod states;
pub mod step_state_machine;

pub use actions::publish_transition;
pub use errors::{StateMachineError, StateMachineResult};
pub use events::StepEvent;
pub use states::StepState;
pub use step_state_machine::{StepStateMachine, Transition};
