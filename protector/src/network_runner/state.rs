use std::fmt;

use wallet_bridge::UNRECOGNIZED_CHAIN_CODE;

use super::networks::TargetNetwork;
use crate::error::AbortReason;

/// States of one network-aware action invocation.
///
/// ```text
/// Idle -> ChainCheck -> Proceed ---------------------------------------------> Execute -> Done
///                    \-> SwitchRequested -> ProviderRefresh -> Verify ------/
///                          |                    ^               \-> Aborted
///                          |-> ChainUnrecognized -> AddRequested -> SwitchRetry
///                          \-> SwitchFailed -> Aborted
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunnerState {
    Idle,
    ChainCheck,
    Proceed,
    SwitchRequested,
    ChainUnrecognized,
    AddRequested,
    SwitchRetry,
    SwitchFailed(String),
    ProviderRefresh,
    Verify,
    Execute,
    Done,
    Aborted(AbortReason),
}

/// Outcome of the effect performed in the previous state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunnerEvent {
    Start,
    ChainReported(u64),
    ChainCheckFailed(String),
    SwitchAccepted,
    SwitchRejected { code: Option<i64>, message: String },
    ChainAdded,
    AddRejected(String),
    SessionRefreshed,
    RefreshFailed(String),
    /// Moves out of a state that performs no request of its own.
    Continue,
    Finished,
}

impl RunnerState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunnerState::Done | RunnerState::Aborted(_))
    }
}

impl fmt::Display for RunnerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunnerState::SwitchFailed(_) => write!(f, "SwitchFailed"),
            RunnerState::Aborted(_) => write!(f, "Aborted"),
            other => write!(f, "{:?}", other),
        }
    }
}

/// Pure transition function of the runner.
///
/// Every (state, event) pair the driver can produce maps to exactly one next
/// state; anything else aborts with [`AbortReason::UnexpectedEvent`].
pub fn transition(state: &RunnerState, event: RunnerEvent, target: &TargetNetwork) -> RunnerState {
    use RunnerEvent as E;
    use RunnerState as S;

    match (state, event) {
        (S::Idle, E::Start) => S::ChainCheck,

        (S::ChainCheck, E::ChainReported(chain_id)) if chain_id == target.chain_id => S::Proceed,
        (S::ChainCheck, E::ChainReported(_)) => S::SwitchRequested,
        (S::ChainCheck, E::ChainCheckFailed(message)) => {
            S::Aborted(AbortReason::ChainCheckFailed(message))
        }

        (S::Proceed, E::Continue) => S::Execute,

        (S::SwitchRequested, E::SwitchAccepted) => S::ProviderRefresh,
        (S::SwitchRequested, E::SwitchRejected { code, message }) => {
            if code == Some(UNRECOGNIZED_CHAIN_CODE) && target.registration.is_some() {
                S::ChainUnrecognized
            } else {
                S::SwitchFailed(message)
            }
        }

        (S::ChainUnrecognized, E::Continue) => S::AddRequested,

        (S::AddRequested, E::ChainAdded) => S::SwitchRetry,
        (S::AddRequested, E::AddRejected(message)) => S::SwitchFailed(message),

        (S::SwitchRetry, E::SwitchAccepted) => S::ProviderRefresh,
        (S::SwitchRetry, E::SwitchRejected { message, .. }) => S::SwitchFailed(message),

        (S::SwitchFailed(message), E::Continue) => S::Aborted(AbortReason::SwitchFailed {
            network: target.name.to_string(),
            message: message.clone(),
        }),

        (S::ProviderRefresh, E::SessionRefreshed) => S::Verify,
        (S::ProviderRefresh, E::RefreshFailed(message)) => {
            S::Aborted(AbortReason::RefreshFailed(message))
        }

        (S::Verify, E::ChainReported(chain_id)) if chain_id == target.chain_id => S::Execute,
        (S::Verify, E::ChainReported(chain_id)) => S::Aborted(AbortReason::ChainMismatch {
            expected: target.chain_id,
            actual: chain_id,
        }),

        (S::Execute, E::Finished) => S::Done,

        (state, event) => S::Aborted(AbortReason::UnexpectedEvent {
            state: state.to_string(),
            event: format!("{:?}", event),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network_runner::networks::Network;

    fn rejected(code: i64) -> RunnerEvent {
        RunnerEvent::SwitchRejected {
            code: Some(code),
            message: "rejected".to_string(),
        }
    }

    #[test]
    fn test_matching_chain_proceeds() {
        let target = Network::Sepolia.target();
        let state = transition(&RunnerState::Idle, RunnerEvent::Start, &target);
        assert_eq!(state, RunnerState::ChainCheck);

        let state = transition(&state, RunnerEvent::ChainReported(11155111), &target);
        assert_eq!(state, RunnerState::Proceed);

        let state = transition(&state, RunnerEvent::Continue, &target);
        assert_eq!(state, RunnerState::Execute);

        let state = transition(&state, RunnerEvent::Finished, &target);
        assert_eq!(state, RunnerState::Done);
        assert!(state.is_terminal());
    }

    #[test]
    fn test_other_chain_requests_switch() {
        let target = Network::Sepolia.target();
        let state = transition(
            &RunnerState::ChainCheck,
            RunnerEvent::ChainReported(5318008),
            &target,
        );
        assert_eq!(state, RunnerState::SwitchRequested);

        let state = transition(&state, RunnerEvent::SwitchAccepted, &target);
        assert_eq!(state, RunnerState::ProviderRefresh);

        let state = transition(&state, RunnerEvent::SessionRefreshed, &target);
        assert_eq!(state, RunnerState::Verify);

        let state = transition(&state, RunnerEvent::ChainReported(11155111), &target);
        assert_eq!(state, RunnerState::Execute);
    }

    #[test]
    fn test_unrecognized_chain_registers_only_custom_network() {
        let kopli = Network::Kopli.target();
        let state = transition(&RunnerState::SwitchRequested, rejected(4902), &kopli);
        assert_eq!(state, RunnerState::ChainUnrecognized);

        let state = transition(&state, RunnerEvent::Continue, &kopli);
        assert_eq!(state, RunnerState::AddRequested);

        let state = transition(&state, RunnerEvent::ChainAdded, &kopli);
        assert_eq!(state, RunnerState::SwitchRetry);

        let sepolia = Network::Sepolia.target();
        let state = transition(&RunnerState::SwitchRequested, rejected(4902), &sepolia);
        assert_eq!(state, RunnerState::SwitchFailed("rejected".to_string()));
    }

    #[test]
    fn test_failed_retry_aborts() {
        let kopli = Network::Kopli.target();
        let state = transition(&RunnerState::SwitchRetry, rejected(4902), &kopli);
        assert_eq!(state, RunnerState::SwitchFailed("rejected".to_string()));

        let state = transition(&state, RunnerEvent::Continue, &kopli);
        assert_eq!(
            state,
            RunnerState::Aborted(AbortReason::SwitchFailed {
                network: "Kopli".to_string(),
                message: "rejected".to_string(),
            })
        );
    }

    #[test]
    fn test_user_rejection_aborts_without_registration() {
        let kopli = Network::Kopli.target();
        let state = transition(&RunnerState::SwitchRequested, rejected(4001), &kopli);
        assert_eq!(state, RunnerState::SwitchFailed("rejected".to_string()));
    }

    #[test]
    fn test_verify_mismatch_aborts() {
        let target = Network::Sepolia.target();
        let state = transition(&RunnerState::Verify, RunnerEvent::ChainReported(5318008), &target);
        assert_eq!(
            state,
            RunnerState::Aborted(AbortReason::ChainMismatch {
                expected: 11155111,
                actual: 5318008,
            })
        );
    }

    #[test]
    fn test_unexpected_event_aborts() {
        let target = Network::Sepolia.target();
        let state = transition(&RunnerState::Idle, RunnerEvent::SwitchAccepted, &target);
        assert!(matches!(
            state,
            RunnerState::Aborted(AbortReason::UnexpectedEvent { .. })
        ));
    }
}
