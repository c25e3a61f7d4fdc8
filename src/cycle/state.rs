use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CycleState {
    Idle = 0,
    Running = 1,
    Completed = 2,
    Failed = 3,
}

impl CycleState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => CycleState::Running,
            2 => CycleState::Completed,
            3 => CycleState::Failed,
            _ => CycleState::Idle,
        }
    }
}

impl fmt::Display for CycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CycleState::Idle => "Idle",
            CycleState::Running => "Running",
            CycleState::Completed => "Completed",
            CycleState::Failed => "Failed",
        })
    }
}

/// Shared cycle state. Only the Idle→Running transition is contended, and it
/// goes through a compare-and-swap.
#[derive(Debug, Default)]
pub struct RunState(AtomicU8);

impl RunState {
    pub fn current(&self) -> CycleState {
        CycleState::from_u8(self.0.load(Ordering::Acquire))
    }

    pub fn is_idle(&self) -> bool {
        self.current() == CycleState::Idle
    }

    /// Idle→Running; `false` if another cycle holds the state.
    pub(crate) fn try_begin(&self) -> bool {
        self.0
            .compare_exchange(
                CycleState::Idle as u8,
                CycleState::Running as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    pub(crate) fn store(&self, state: CycleState) {
        self.0.store(state as u8, Ordering::Release);
    }
}
