pub mod config;
pub mod design;
pub mod error;
pub mod forced;
pub mod practice;
pub mod reward;
pub mod state;
pub mod totals;
pub mod transition;
pub mod trial;
pub mod window;

pub use config::{AlienPracticeRounds, SessionConfig};
pub use design::{BlockPlan, SessionPlan};
pub use error::ConfigError;
pub use practice::{AlienPracticeTrial, PracticeState};
pub use state::{ActiveTrial, SessionEvent, SessionStateMachine, SessionSummary};
pub use totals::RunningTotals;
pub use trial::{TrialEnv, TrialEvent, TrialResponse, TrialStep, TwoStepTrial};
pub use window::{HoldKind, InputWindows, KeyPress, WindowId};
