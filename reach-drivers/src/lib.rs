//! Driver layer: humanised input synthesis and browser automation.
//!
//! - [`humanize`]: motion, cadence and reading synthesizers plus the pacer
//! - [`actuator::Actuator`]: paces every click, keystroke and scroll over a surface
//! - [`reach_browser::surface::ActionSurface`]: the browser capabilities consumed upstream
//! - [`reach_browser::driver::ReachDriver`]: `fantoccini` session with stealth and fingerprinting
pub mod actuator;
pub mod humanize;
pub mod reach_browser;

pub use actuator::{Actuator, HumanizeOptions};
pub use humanize::pacing::{ActuationError, ActuationResult, Span};
pub use reach_browser::signals::Signal;
pub use reach_browser::surface::{ActionSurface, Key, SessionCookie};
