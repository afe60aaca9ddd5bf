use serde::Serialize;

/// Lifecycle of a consumer loop. `Stopped` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsumerState {
    #[default]
    Starting,
    Running,
    Draining,
    Stopped,
}

impl ConsumerState {
    /// Whether `self -> next` is a legal transition.
    ///
    /// Fatal errors may skip `Draining`; a stop requested before the
    /// subscription completes goes straight to `Draining`.
    pub fn can_advance_to(self, next: ConsumerState) -> bool {
        use ConsumerState::*;
        matches!(
            (self, next),
            (Starting, Running)
                | (Starting, Draining)
                | (Starting, Stopped)
                | (Running, Draining)
                | (Running, Stopped)
                | (Draining, Stopped)
        )
    }

    pub fn is_terminal(self) -> bool {
        self == ConsumerState::Stopped
    }
}

impl std::fmt::Display for ConsumerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConsumerState::Starting => f.write_str("starting"),
            ConsumerState::Running => f.write_str("running"),
            ConsumerState::Draining => f.write_str("draining"),
            ConsumerState::Stopped => f.write_str("stopped"),
        }
    }
}
