pub mod timer;

pub use timer::{HighPrecisionTimer, ManualTimer, Timer, NANOS_PER_MILLI};
