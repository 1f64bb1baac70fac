//! Human-plausible input synthesis: pointer paths, keystroke and scroll
//! cadence, page reading, and the pacing every pause goes through.

pub mod cadence;
pub mod motion;
pub mod pacing;
pub mod scroll;
