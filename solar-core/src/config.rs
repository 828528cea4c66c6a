use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Panel specification, site constants and pointer thresholds.
///
/// Every field has a default so a partial JSON object is accepted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolarConfig {
    /// Long side of one panel (m).
    pub panel_width_m: f64,
    /// Short side of one panel (m).
    pub panel_height_m: f64,
    /// Rated output of one panel (W).
    pub panel_power_w: f64,
    /// Gap kept between neighbouring panels (m).
    pub panel_spacing_m: f64,
    /// Average full-sun hours per day.
    pub avg_sunlight_hours: f64,
    /// kg of CO2 avoided per kWh produced.
    pub carbon_offset_kg_per_kwh: f64,
    /// Metres per drawing-surface pixel.
    pub pixels_to_meters: f64,
    /// Tap distance to the first point that closes an outline (px).
    pub close_radius_px: f64,
    /// Tap distance that grabs an existing point (px).
    pub point_hit_radius_px: f64,
}

impl Default for SolarConfig {
    fn default() -> Self {
        Self {
            panel_width_m: 1.9,
            panel_height_m: 1.0,
            panel_power_w: 350.0,
            panel_spacing_m: 0.1,
            avg_sunlight_hours: 4.5,
            carbon_offset_kg_per_kwh: 0.5,
            pixels_to_meters: 0.1,
            close_radius_px: 10.0,
            point_hit_radius_px: 15.0,
        }
    }
}

impl SolarConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("panel_width_m", self.panel_width_m),
            ("panel_height_m", self.panel_height_m),
            ("panel_power_w", self.panel_power_w),
            ("pixels_to_meters", self.pixels_to_meters),
            ("close_radius_px", self.close_radius_px),
            ("point_hit_radius_px", self.point_hit_radius_px),
        ];
        for (field, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::NotPositive { field, value });
            }
        }

        let non_negative = [
            ("panel_spacing_m", self.panel_spacing_m),
            ("avg_sunlight_hours", self.avg_sunlight_hours),
            ("carbon_offset_kg_per_kwh", self.carbon_offset_kg_per_kwh),
        ];
        for (field, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::Negative { field, value });
            }
        }

        if self.point_hit_radius_px <= self.close_radius_px {
            return Err(ConfigError::HitRadiusNotLarger {
                hit: self.point_hit_radius_px,
                close: self.close_radius_px,
            });
        }
        Ok(())
    }

    pub fn meters_to_pixels(&self, meters: f64) -> f64 {
        meters / self.pixels_to_meters
    }

    pub fn square_pixels_to_meters(&self, area_px: f64) -> f64 {
        area_px * self.pixels_to_meters * self.pixels_to_meters
    }
}
