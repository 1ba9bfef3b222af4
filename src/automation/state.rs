//! Orchestrator lifecycle states.
//!
//! Idle → Calibrating → AwaitingConfirmation → Running → Stopping → Idle.
//! A rejected calibration goes from AwaitingConfirmation back to
//! Calibrating.

/// Orchestrator lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LifecycleState {
    /// Nothing running
    #[default]
    Idle,
    /// Waiting for the user to finish a drag/resize gesture
    Calibrating,
    /// A rectangle was proposed, waiting for yes/no
    AwaitingConfirmation,
    /// Capture thread and decide/act loop are live
    Running,
    /// Shutting threads down
    Stopping,
}

impl LifecycleState {
    /// Short status text for the overlay.
    pub fn description_zh(&self) -> &'static str {
        match self {
            LifecycleState::Idle => "空闲",
            LifecycleState::Calibrating => "请拖动或调整商店区域",
            LifecycleState::AwaitingConfirmation => "等待确认",
            LifecycleState::Running => "运行中",
            LifecycleState::Stopping => "正在停止",
        }
    }

    /// True while calibration gestures should be accepted.
    pub fn is_calibrating(&self) -> bool {
        matches!(
            self,
            LifecycleState::Calibrating | LifecycleState::AwaitingConfirmation
        )
    }
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LifecycleState::Idle => write!(f, "Idle"),
            LifecycleState::Calibrating => write!(f, "Calibrating"),
            LifecycleState::AwaitingConfirmation => write!(f, "Awaiting confirmation"),
            LifecycleState::Running => write!(f, "Running"),
            LifecycleState::Stopping => write!(f, "Stopping"),
        }
    }
}
