//! Plant health scoring and watering estimation.
//!
//! Everything under this module is synchronous and free of I/O except
//! model file loading in [`service`].

pub mod features;
pub mod forest;
pub mod health;
pub mod service;
pub mod synthetic;
pub mod types;
pub mod watering;

pub use service::{ModelService, ModelStatus};

/// Round half away from zero to `places` decimals.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::round_to;

    #[test]
    fn rounds_to_places() {
        assert_eq!(round_to(66.0712, 1), 66.1);
        assert_eq!(round_to(0.21345, 2), 0.21);
        assert_eq!(round_to(-2.36, 1), -2.4);
        assert_eq!(round_to(7.0, 0), 7.0);
    }
}
