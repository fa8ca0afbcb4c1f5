//! Run state machine.
//!
//! The order is fixed: NotStarted -> Deploying -> Configuring -> Done.
//! `Failed` is terminal and reachable from Deploying or Configuring only.

use serde::{Deserialize, Serialize};

/// The two stages in which a run can fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum Stage {
    Deploying,
    Configuring,
}

/// State of one orchestration run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunState {
    NotStarted,
    Deploying,
    Configuring,
    Done,
    /// Terminal failure, recording the stage and the index of the failing entry.
    Failed { stage: Stage, index: usize },
}

impl RunState {
    /// Whether no further transition is possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Done | RunState::Failed { .. })
    }

    /// Move to the next state in the fixed order.
    pub fn advance(self) -> Result<Self, InvalidTransition> {
        match self {
            RunState::NotStarted => Ok(RunState::Deploying),
            RunState::Deploying => Ok(RunState::Configuring),
            RunState::Configuring => Ok(RunState::Done),
            terminal => Err(InvalidTransition(terminal)),
        }
    }

    /// Fail the current stage at `index`.
    pub fn fail(self, index: usize) -> Result<Self, InvalidTransition> {
        match self {
            RunState::Deploying => Ok(RunState::Failed {
                stage: Stage::Deploying,
                index,
            }),
            RunState::Configuring => Ok(RunState::Failed {
                stage: Stage::Configuring,
                index,
            }),
            other => Err(InvalidTransition(other)),
        }
    }
}

/// A transition was requested from a state that does not allow it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid run state transition from {0:?}")]
pub struct InvalidTransition(pub RunState);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_visits_every_state() {
        let mut state = RunState::NotStarted;
        let mut visited = vec![state];
        while !state.is_terminal() {
            state = state.advance().unwrap();
            visited.push(state);
        }

        assert_eq!(
            visited,
            vec![
                RunState::NotStarted,
                RunState::Deploying,
                RunState::Configuring,
                RunState::Done
            ]
        );
    }

    #[test]
    fn test_fail_records_stage_and_index() {
        assert_eq!(
            RunState::Deploying.fail(3),
            Ok(RunState::Failed {
                stage: Stage::Deploying,
                index: 3
            })
        );
        assert_eq!(
            RunState::Configuring.fail(0),
            Ok(RunState::Failed {
                stage: Stage::Configuring,
                index: 0
            })
        );
    }

    #[test]
    fn test_fail_not_allowed_outside_active_stages() {
        assert!(RunState::NotStarted.fail(0).is_err());
        assert!(RunState::Done.fail(0).is_err());
    }

    #[test]
    fn test_terminal_states_do_not_advance() {
        assert!(RunState::Done.advance().is_err());
        let failed = RunState::Deploying.fail(1).unwrap();
        assert!(failed.advance().is_err());
        assert!(failed.fail(2).is_err());
    }
}
