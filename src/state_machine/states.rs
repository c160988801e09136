use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle states of a step instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StepState {
    /// Registered with the executor, entry behavior not yet run
    #[default]
    Pending,
    /// Entry or resumption behavior is running
    InProgress,
    /// Waiting for an async key to be completed or expired
    Suspended,
    /// Step completed successfully
    Complete,
    /// Step failed with an error
    Error,
}

impl StepState {
    /// Check if this is a terminal state (no further transitions allowed)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Error)
    }

    /// Check if this is an active state (step logic is running)
    pub fn is_active(&self) -> bool {
        matches!(self, Self::InProgress)
    }

    pub fn is_suspended(&self) -> bool {
        matches!(self, Self::Suspended)
    }
}

impl fmt::Display for StepState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::InProgress => write!(f, "in_progress"),
            Self::Suspended => write!(f, "suspended"),
            Self::Complete => write!(f, "complete"),
            Self::Error => write!(f, "error"),
        }
    }
}

impl std::str::FromStr for StepState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "in_progress" => Ok(Self::InProgress),
            "suspended" => Ok(Self::Suspended),
            "complete" => Ok(Self::Complete),
            "error" => Ok(Self::Error),
            _ => Err(format!("Invalid step state: {s}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_state_terminal_check() {
        assert!(StepState::Complete.is_terminal());
        assert!(StepState::Error.is_terminal());
        assert!(!StepState::Pending.is_terminal());
        assert!(!StepState::InProgress.is_terminal());
        assert!(!StepState::Suspended.is_terminal());
    }

    #[test]
    fn test_state_string_conversion() {
        assert_eq!(StepState::InProgress.to_string(), "in_progress");
        assert_eq!(
            "suspended".parse::<StepState>().unwrap(),
            StepState::Suspended
        );
        assert!("bogus".parse::<StepState>().is_err());
    }

    #[test]
    fn test_state_serde() {
        let json = serde_json::to_string(&StepState::InProgress).unwrap();
        assert_eq!(json, "\"in_progress\"");
        let parsed: StepState = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, StepState::InProgress);
    }
}
