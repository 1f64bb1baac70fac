pub mod cursor;
pub mod driver;
pub mod fingerprint;
pub mod page;
pub mod selectors;
pub mod signals;
pub mod stealth;
pub mod surface;
