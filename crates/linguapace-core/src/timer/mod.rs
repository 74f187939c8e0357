mod clock;
mod cycle;

pub use clock::{ClockSignal, ClockState, CountdownClock, SessionClock};
pub use cycle::{next_phase, CompletedInterval, IntervalCycleEngine, IntervalPhase, IntervalSettings};
