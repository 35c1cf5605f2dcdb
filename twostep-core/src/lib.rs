pub mod config;
pub mod layout;
pub mod phase;
pub mod presenter;
pub mod trial;

pub use config::{AlienPracticeConfig, ForcedOverrides, TrialConfig, TrialMeta};
pub use layout::{DisplayMapping, Side, Stage};
pub use phase::SessionPhase;
pub use presenter::{Presented, Presenter, RecordingPresenter};
pub use trial::{TrialKind, TrialRecord, TrialState};
