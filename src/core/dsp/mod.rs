//! Digital Signal Processing utilities

pub mod fft;
pub mod interp;
pub mod response;
pub mod smoothing;
pub mod stats;
pub mod windows;

pub use fft::PsdEstimator;
pub use response::ChannelResponse;
pub use smoothing::{smooth, SmoothingMethod};
pub use windows::{create_window, WindowType};

/// Floor for linear power before square roots and logarithms
pub const POWER_FLOOR: f64 = 1e-20;

/// Linear power to decibels, floored at `POWER_FLOOR`
pub fn power_to_db(power: f64) -> f64 {
    10.0 * power.max(POWER_FLOOR).log10()
}

/// Decibels to linear power
pub fn db_to_power(db: f64) -> f64 {
    10.0_f64.powf(db / 10.0)
}
