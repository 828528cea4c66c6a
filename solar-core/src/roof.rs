use log::debug;
use serde::{Deserialize, Serialize};

use crate::config::SolarConfig;
use crate::energy::{EnergyEstimate, estimate_energy};
use crate::error::RoofError;
use crate::geometry::{BoundingBox, Point, bounding_box, centroid, polygon_area};
use crate::packing::{Orientation, PackingMode, PanelLayout, pack_panels};

pub const DEFAULT_ANGLE_DEG: f64 = 20.0;
pub const DEFAULT_AZIMUTH_DEG: f64 = 180.0;

/// Everything computed from a roof outline and its mounting parameters.
///
/// Always produced as a whole by [`RoofMetrics::derive`]; there is no way to
/// update a single field.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoofMetrics {
    pub area_pixels: f64,
    pub area_meters: f64,
    pub bounding_box: BoundingBox,
    pub panel_layout: PanelLayout,
    #[serde(flatten)]
    pub energy: EnergyEstimate,
}

impl RoofMetrics {
    /// Geometry, packing and energy in one pass. Outlines with fewer than
    /// three points yield all zeros.
    pub fn derive(
        points: &[Point],
        orientation: Orientation,
        angle: f64,
        azimuth: f64,
        mode: PackingMode,
        config: &SolarConfig,
    ) -> Self {
        if points.len() < 3 {
            return Self::default();
        }
        let Some(bbox) = bounding_box(points) else {
            return Self::default();
        };
        let area_pixels = polygon_area(points);
        let panel_layout = pack_panels(points, &bbox, area_pixels, orientation, mode, config);
        let energy = estimate_energy(panel_layout.estimated_panels, angle, azimuth, config);

        Self {
            area_pixels,
            area_meters: config.square_pixels_to_meters(area_pixels),
            bounding_box: bbox,
            panel_layout,
            energy,
        }
    }

    pub fn estimated_panels(&self) -> u32 {
        self.panel_layout.estimated_panels
    }
}

/// Subset of mounting parameters to change; `None` keeps the current value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrientationUpdate {
    pub orientation: Option<Orientation>,
    pub angle: Option<f64>,
    pub azimuth: Option<f64>,
}

/// A traced roof outline with its estimates.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Roof {
    points: Vec<Point>,
    color: &'static str,
    orientation: Orientation,
    angle: f64,
    azimuth: f64,
    pub pitch: Option<String>,
    pub direction: Option<String>,
    #[serde(flatten)]
    metrics: RoofMetrics,
}

impl Roof {
    pub fn new(
        points: Vec<Point>,
        color: &'static str,
        mode: PackingMode,
        config: &SolarConfig,
    ) -> Result<Self, RoofError> {
        if points.len() < 3 {
            return Err(RoofError::TooFewPoints {
                count: points.len(),
            });
        }
        let mut roof = Self {
            points,
            color,
            orientation: Orientation::default(),
            angle: DEFAULT_ANGLE_DEG,
            azimuth: DEFAULT_AZIMUTH_DEG,
            pitch: None,
            direction: None,
            metrics: RoofMetrics::default(),
        };
        roof.recompute(mode, config);
        Ok(roof)
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn color(&self) -> &'static str {
        self.color
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn angle(&self) -> f64 {
        self.angle
    }

    pub fn azimuth(&self) -> f64 {
        self.azimuth
    }

    pub fn metrics(&self) -> &RoofMetrics {
        &self.metrics
    }

    /// Where a label for this roof goes.
    pub fn label_position(&self) -> Option<Point> {
        centroid(&self.points)
    }

    /// Index of the vertex nearest to `p` within `radius`.
    pub fn hit_point(&self, p: Point, radius: f64) -> Option<usize> {
        nearest_within(&self.points, p, radius)
    }

    pub(crate) fn recompute(&mut self, mode: PackingMode, config: &SolarConfig) {
        self.metrics = RoofMetrics::derive(
            &self.points,
            self.orientation,
            self.angle,
            self.azimuth,
            mode,
            config,
        );
        debug!(
            "roof derived. area_m2: {:.2}, panels: {}, kw: {:.2}",
            self.metrics.area_meters,
            self.metrics.estimated_panels(),
            self.metrics.energy.system_size_kw
        );
    }

    pub(crate) fn point_mut(&mut self, index: usize) -> Option<&mut Point> {
        self.points.get_mut(index)
    }

    pub(crate) fn apply(&mut self, update: &OrientationUpdate) {
        if let Some(orientation) = update.orientation {
            self.orientation = orientation;
        }
        if let Some(angle) = update.angle {
            self.angle = angle;
        }
        if let Some(azimuth) = update.azimuth {
            self.azimuth = azimuth.rem_euclid(360.0);
        }
    }
}

pub(crate) fn nearest_within(points: &[Point], p: Point, radius: f64) -> Option<usize> {
    points
        .iter()
        .enumerate()
        .map(|(i, q)| (i, q.distance_to(p)))
        .filter(|(_, d)| *d < radius)
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(i, _)| i)
}
