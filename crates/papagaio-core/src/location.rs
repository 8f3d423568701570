//! Random coordinates for location replies.

use crate::chance::Chance;
use crate::config::LocationConfig;

/// A latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

/// Most decimal places an `f64` degree value can carry.
pub const MAX_DECIMALS: u32 = 15;

/// Uniform value in `[from, to]`, rounded to `decimals` places.
///
/// `decimals` above [`MAX_DECIMALS`] is treated as [`MAX_DECIMALS`].
pub fn sample_in_range(chance: &mut dyn Chance, from: f64, to: f64, decimals: u32) -> f64 {
    let raw = chance.unit() * (to - from) + from;
    let scale = 10f64.powi(decimals.min(MAX_DECIMALS) as i32);
    let rounded = (raw * scale).round() / scale;
    rounded.clamp(from.min(to), from.max(to))
}

/// Sample a coordinate. Longitude is drawn first, then latitude.
pub fn random_coordinate(chance: &mut dyn Chance, cfg: &LocationConfig) -> Coordinate {
    let longitude = sample_in_range(chance, cfg.longitude_min, cfg.longitude_max, cfg.decimals);
    let latitude = sample_in_range(chance, cfg.latitude_min, cfg.latitude_max, cfg.decimals);
    Coordinate {
        latitude,
        longitude,
    }
}
