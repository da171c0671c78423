use crate::stages::Stage;

/// States a run passes through, in order. Optional states are simply absent
/// from a run's trace when skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Init,
    RuntimeUp,
    Restored,
    Stage(Stage),
    Dumped,
    Versioned,
    Reported,
    RuntimeDown,
    Done,
}

impl Phase {
    /// Rank in the state machine. A valid trace is strictly increasing.
    pub fn rank(&self) -> usize {
        match self {
            Self::Init => 0,
            Self::RuntimeUp => 1,
            Self::Restored => 2,
            Self::Stage(stage) => 2 + stage.ordinal(),
            Self::Dumped => 11,
            Self::Versioned => 12,
            Self::Reported => 13,
            Self::RuntimeDown => 14,
            Self::Done => 15,
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Stage(stage) => write!(f, "stage {} {}", stage.ordinal(), stage),
            other => write!(f, "{:?}", other),
        }
    }
}
