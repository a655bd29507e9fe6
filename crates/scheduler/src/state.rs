use serde::Serialize;

/// Where the scheduler is in its lifecycle.
///
/// A tick walks `Idle → Polling → Evaluating → Dispatching → Persisting → Idle`.
/// `Disabled` means the timer runs but ticks are skipped; `Stopped` is final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SchedulerState {
    Idle,
    Polling,
    Evaluating,
    Dispatching,
    Persisting,
    Disabled,
    Stopped,
}

impl SchedulerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SchedulerState::Idle => "idle",
            SchedulerState::Polling => "polling",
            SchedulerState::Evaluating => "evaluating",
            SchedulerState::Dispatching => "dispatching",
            SchedulerState::Persisting => "persisting",
            SchedulerState::Disabled => "disabled",
            SchedulerState::Stopped => "stopped",
        }
    }
}

impl std::fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
