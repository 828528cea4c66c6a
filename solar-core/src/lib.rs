//! Roof tracing and solar estimation engine.
//!
//! Points arrive in drawing-surface pixels; every roof keeps its area, panel
//! layout and energy figures derived from those points in one pass.

pub mod config;
pub mod energy;
pub mod error;
pub mod geometry;
pub mod packing;
pub mod roof;
pub mod session;
pub mod store;

pub use config::SolarConfig;
pub use energy::EnergyEstimate;
pub use error::{ConfigError, RoofError, SessionError};
pub use geometry::{BoundingBox, Point};
pub use packing::{Orientation, PackingMode, PanelCell, PanelLayout};
pub use roof::{OrientationUpdate, Roof, RoofMetrics};
pub use session::{PointerOutcome, Session, SessionState, SessionStateKind};
pub use store::{RoofStore, RoofTotals, SubscriptionId};

/// Roof outline colours, assigned in drawing order and cycling.
pub const ROOF_PALETTE: [&str; 4] = ["green", "purple", "orange", "blue"];

pub fn roof_color(i: usize) -> &'static str {
    ROOF_PALETTE[i % ROOF_PALETTE.len()]
}

/// Coarse compass label for a roof azimuth, used next to the azimuth input.
/// Bearings facing away from the sun (north-ish) have no label.
pub fn cardinal_direction(azimuth: f64) -> Option<&'static str> {
    let az = azimuth.floor();
    if (90.0..135.0).contains(&az) {
        Some("East")
    } else if (135.0..225.0).contains(&az) {
        Some("South")
    } else if (225.0..=270.0).contains(&az) {
        Some("West")
    } else {
        None
    }
}

#[cfg(test)]
mod palette_tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(0, "green")]
    #[case(1, "purple")]
    #[case(2, "orange")]
    #[case(3, "blue")]
    #[case(4, "green")]
    fn test_roof_color_cycles(#[case] index: usize, #[case] expected: &str) {
        assert_eq!(roof_color(index), expected);
    }

    #[rstest]
    #[case(0.0, None)]
    #[case(89.9, None)]
    #[case(90.0, Some("East"))]
    #[case(134.5, Some("East"))]
    #[case(135.0, Some("South"))]
    #[case(180.0, Some("South"))]
    #[case(224.9, Some("South"))]
    #[case(225.0, Some("West"))]
    #[case(270.0, Some("West"))]
    #[case(271.0, None)]
    fn test_cardinal_direction(#[case] azimuth: f64, #[case] expected: Option<&str>) {
        assert_eq!(cardinal_direction(azimuth), expected, "azimuth: {azimuth}");
    }
}
