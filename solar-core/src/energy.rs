use serde::{Deserialize, Serialize};

use crate::config::SolarConfig;

pub const OPTIMAL_TILT_DEG: f64 = 30.0;
pub const OPTIMAL_AZIMUTH_DEG: f64 = 180.0;
pub const MIN_FACTOR: f64 = 0.7;
pub const DAYS_PER_YEAR: f64 = 365.0;

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EnergyEstimate {
    #[serde(rename = "systemSizeKW")]
    pub system_size_kw: f64,
    #[serde(rename = "dailyProductionKWh")]
    pub daily_production_kwh: f64,
    #[serde(rename = "annualProductionKWh")]
    pub annual_production_kwh: f64,
    #[serde(rename = "annualCO2OffsetKg")]
    pub annual_co2_offset_kg: f64,
}

/// Tilt derating: 1.0 at 30°, linear falloff, never below 0.7.
pub fn angle_factor(angle_deg: f64) -> f64 {
    (1.0 - (angle_deg - OPTIMAL_TILT_DEG).abs() / 60.0).clamp(MIN_FACTOR, 1.0)
}

/// Compass derating: 1.0 facing due south, linear falloff, never below 0.7.
pub fn azimuth_factor(azimuth_deg: f64) -> f64 {
    (1.0 - (azimuth_deg - OPTIMAL_AZIMUTH_DEG).abs() / 180.0).clamp(MIN_FACTOR, 1.0)
}

pub fn efficiency_factor(angle_deg: f64, azimuth_deg: f64) -> f64 {
    angle_factor(angle_deg) * azimuth_factor(azimuth_deg)
}

pub fn estimate_energy(
    panels: u32,
    angle_deg: f64,
    azimuth_deg: f64,
    config: &SolarConfig,
) -> EnergyEstimate {
    let system_size_kw = panels as f64 * config.panel_power_w / 1000.0;
    let daily_production_kwh =
        system_size_kw * config.avg_sunlight_hours * efficiency_factor(angle_deg, azimuth_deg);
    let annual_production_kwh = daily_production_kwh * DAYS_PER_YEAR;
    EnergyEstimate {
        system_size_kw,
        daily_production_kwh,
        annual_production_kwh,
        annual_co2_offset_kg: annual_production_kwh * config.carbon_offset_kg_per_kwh,
    }
}

#[cfg(test)]
mod energy_tests {
    use rstest::rstest;

    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[rstest]
    #[case(30.0, 1.0)]
    #[case(20.0, 1.0 - 10.0 / 60.0)]
    #[case(45.0, 0.75)]
    #[case(0.0, 0.7)]
    #[case(90.0, 0.7)]
    #[case(-400.0, 0.7)]
    fn test_angle_factor(#[case] angle: f64, #[case] expected: f64) {
        let f = angle_factor(angle);
        assert!(close(f, expected), "angle: {angle}, factor: {f}, expected: {expected}");
    }

    #[rstest]
    #[case(180.0, 1.0)]
    #[case(144.0, 0.8)]
    #[case(225.0, 0.75)]
    #[case(0.0, 0.7)]
    #[case(90.0, 0.7)]
    #[case(360.0, 0.7)]
    fn test_azimuth_factor(#[case] azimuth: f64, #[case] expected: f64) {
        let f = azimuth_factor(azimuth);
        assert!(close(f, expected), "azimuth: {azimuth}, factor: {f}, expected: {expected}");
    }

    #[test]
    fn test_factors_stay_in_bounds() {
        for step in -720..=720 {
            let v = step as f64 * 0.5;
            for f in [angle_factor(v), azimuth_factor(v)] {
                assert!((MIN_FACTOR..=1.0).contains(&f), "input: {v}, factor: {f}");
            }
        }
    }

    #[test]
    fn test_estimate_energy_defaults() {
        let config = SolarConfig::default();
        let e = estimate_energy(10, 30.0, 180.0, &config);
        assert!(close(e.system_size_kw, 3.5));
        assert!(close(e.daily_production_kwh, 3.5 * 4.5));
        assert!(close(e.annual_production_kwh, 3.5 * 4.5 * 365.0));
        assert!(close(e.annual_co2_offset_kg, 3.5 * 4.5 * 365.0 * 0.5));
    }

    #[test]
    fn test_zero_panels_produce_nothing() {
        let e = estimate_energy(0, 20.0, 180.0, &SolarConfig::default());
        assert_eq!(e, EnergyEstimate::default());
    }

    #[rstest]
    fn test_more_panels_strictly_more_energy(
        #[values(0.0, 20.0, 55.0)] angle: f64,
        #[values(90.0, 180.0, 300.0)] azimuth: f64,
    ) {
        let config = SolarConfig::default();
        let mut previous = estimate_energy(0, angle, azimuth, &config);
        for panels in 1..50 {
            let next = estimate_energy(panels, angle, azimuth, &config);
            assert!(next.system_size_kw > previous.system_size_kw);
            assert!(next.daily_production_kwh > previous.daily_production_kwh);
            assert!(next.annual_production_kwh > previous.annual_production_kwh);
            assert!(next.annual_co2_offset_kg > previous.annual_co2_offset_kg);
            previous = next;
        }
    }

    #[test]
    fn test_serialized_field_names() {
        let json = serde_json::to_value(EnergyEstimate::default()).unwrap();
        for key in [
            "systemSizeKW",
            "dailyProductionKWh",
            "annualProductionKWh",
            "annualCO2OffsetKg",
        ] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
    }
}
