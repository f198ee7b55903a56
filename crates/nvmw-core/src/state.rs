use std::fmt;

use log::{debug, warn};
use nvmw_backend::NvmError;

/// Phases of an install or activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallState {
    Requested,
    Resolving,
    Downloading,
    Extracting,
    InstallingPackageManager,
    Activating,
    Done,
    Failed,
    Cancelled,
}

impl InstallState {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed | Self::Cancelled)
    }

    /// Whether the machine may move from `self` to `next`.
    ///
    /// Multi-architecture installs loop back to `Downloading` for each pass.
    #[must_use]
    pub fn can_advance_to(self, next: Self) -> bool {
        use InstallState::{
            Activating, Cancelled, Done, Downloading, Extracting, Failed,
            InstallingPackageManager, Requested, Resolving,
        };

        if self.is_terminal() {
            return false;
        }
        match next {
            Failed => true,
            Cancelled => matches!(self, Downloading | Extracting | InstallingPackageManager),
            _ => matches!(
                (self, next),
                (Requested, Resolving)
                    | (Resolving, Downloading | Activating | Done)
                    | (
                        Downloading,
                        Extracting | Downloading | InstallingPackageManager | Done
                    )
                    | (Extracting, Downloading | InstallingPackageManager | Done)
                    | (InstallingPackageManager, Activating | Done)
                    | (Activating, Done)
            ),
        }
    }
}

impl InstallState {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Requested => "requested",
            Self::Resolving => "resolving",
            Self::Downloading => "downloading",
            Self::Extracting => "extracting",
            Self::InstallingPackageManager => "installing npm",
            Self::Activating => "activating",
            Self::Done => "done",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for InstallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Tracks the current phase and logs each transition.
#[derive(Debug)]
pub struct Transitions {
    current: InstallState,
}

impl Default for Transitions {
    fn default() -> Self {
        Self {
            current: InstallState::Requested,
        }
    }
}

impl Transitions {
    #[must_use]
    pub fn current(&self) -> InstallState {
        self.current
    }

    /// Move to `next`; every phase of an operation goes through here.
    ///
    /// # Errors
    /// Returns [`NvmError::InvalidTransition`] when `next` is not reachable
    /// from the current phase. The current phase is left unchanged.
    pub fn advance(&mut self, next: InstallState) -> Result<(), NvmError> {
        if !self.current.can_advance_to(next) {
            return Err(NvmError::InvalidTransition {
                from: self.current.name(),
                to: next.name(),
            });
        }
        debug!("State {} -> {next}", self.current);
        self.current = next;
        Ok(())
    }

    /// Record the terminal state for an operation result.
    pub fn finish<T>(&mut self, result: &Result<T, NvmError>) {
        let next = match result {
            Ok(_) => InstallState::Done,
            Err(NvmError::Cancelled) if self.current.can_advance_to(InstallState::Cancelled) => {
                InstallState::Cancelled
            }
            Err(_) => InstallState::Failed,
        };
        if let Err(error) = self.advance(next) {
            warn!("{error}");
        }
    }
}

#[cfg(test)]
mod tests {
    use nvmw_backend::NvmError;

    use super::{InstallState, Transitions};

    #[test]
    fn happy_path_is_allowed() {
        let path = [
            InstallState::Requested,
            InstallState::Resolving,
            InstallState::Downloading,
            InstallState::Extracting,
            InstallState::InstallingPackageManager,
            InstallState::Activating,
            InstallState::Done,
        ];
        for pair in path.windows(2) {
            assert!(pair[0].can_advance_to(pair[1]), "{} -> {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn terminal_states_absorb() {
        for state in [InstallState::Done, InstallState::Failed, InstallState::Cancelled] {
            assert!(state.is_terminal());
            assert!(!state.can_advance_to(InstallState::Failed));
            assert!(!state.can_advance_to(InstallState::Resolving));
        }
    }

    #[test]
    fn cancellation_only_during_transfer_phases() {
        assert!(InstallState::Downloading.can_advance_to(InstallState::Cancelled));
        assert!(InstallState::Extracting.can_advance_to(InstallState::Cancelled));
        assert!(!InstallState::Resolving.can_advance_to(InstallState::Cancelled));
        assert!(!InstallState::Activating.can_advance_to(InstallState::Cancelled));
    }

    #[test]
    fn cancel_while_resolving_ends_failed() {
        let mut transitions = Transitions::default();
        transitions.advance(InstallState::Resolving).expect("resolving is reachable");
        transitions.finish::<()>(&Err(NvmError::Cancelled));
        assert_eq!(transitions.current(), InstallState::Failed);

        let mut transitions = Transitions::default();
        transitions.advance(InstallState::Resolving).expect("resolving is reachable");
        transitions.advance(InstallState::Downloading).expect("downloading is reachable");
        transitions.finish::<()>(&Err(NvmError::Cancelled));
        assert_eq!(transitions.current(), InstallState::Cancelled);
    }

    #[test]
    fn illegal_moves_are_refused() {
        let mut transitions = Transitions::default();
        let error = transitions
            .advance(InstallState::Extracting)
            .expect_err("extracting is not reachable from requested");
        assert_eq!(
            error,
            NvmError::InvalidTransition {
                from: "requested",
                to: "extracting",
            }
        );
        assert_eq!(transitions.current(), InstallState::Requested);

        transitions.finish::<()>(&Err(error));
        assert_eq!(transitions.current(), InstallState::Failed);
    }
}
