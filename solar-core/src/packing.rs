use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::config::SolarConfig;
use crate::geometry::{BoundingBox, Point, point_in_polygon};

/// Panel mounting direction. Landscape keeps the long side horizontal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Landscape,
    Portrait,
}

/// How far the panel count is refined beyond the bounding-box grid.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackingMode {
    /// Grid over the bounding box scaled by polygon coverage.
    #[default]
    Estimate,
    /// Additionally count only grid cells whose centre lies inside the outline.
    Exact,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PanelLayout {
    pub panels_wide: u32,
    pub panels_high: u32,
    pub estimated_panels: u32,
    pub panel_width_px: f64,
    pub panel_height_px: f64,
    pub spacing_px: f64,
}

/// One grid slot, in drawing-surface pixels.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PanelCell {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl PanelCell {
    pub fn center(&self) -> Point {
        Point {
            x: self.x + self.width / 2.0,
            y: self.y + self.height / 2.0,
        }
    }
}

/// Bounding-box grid estimate corrected by how much of the box the outline covers.
///
/// The minimum-one-panel rule is not applied here; see [`pack_panels`].
pub fn grid_layout(
    bbox: &BoundingBox,
    area_px: f64,
    orientation: Orientation,
    config: &SolarConfig,
) -> PanelLayout {
    let (width_m, height_m) = match orientation {
        Orientation::Landscape => (config.panel_width_m, config.panel_height_m),
        Orientation::Portrait => (config.panel_height_m, config.panel_width_m),
    };
    let panel_width_px = config.meters_to_pixels(width_m);
    let panel_height_px = config.meters_to_pixels(height_m);
    let spacing_px = config.meters_to_pixels(config.panel_spacing_m);

    let panels_wide = fit_count(bbox.width, panel_width_px, spacing_px);
    let panels_high = fit_count(bbox.height, panel_height_px, spacing_px);
    let raw = u64::from(panels_wide) * u64::from(panels_high);

    let rect_area = bbox.area();
    let coverage = if rect_area > 0.0 {
        area_px / rect_area
    } else {
        0.0
    };
    let estimated_panels = (raw as f64 * coverage)
        .floor()
        .clamp(0.0, f64::from(u32::MAX)) as u32;

    PanelLayout {
        panels_wide,
        panels_high,
        estimated_panels,
        panel_width_px,
        panel_height_px,
        spacing_px,
    }
}

fn fit_count(available: f64, size: f64, spacing: f64) -> u32 {
    ((available + spacing) / (size + spacing)).floor().max(0.0) as u32
}

/// Every grid slot of `layout`, row by row, with the grid centred in `bbox`.
pub fn grid_cells(bbox: &BoundingBox, layout: &PanelLayout) -> impl Iterator<Item = PanelCell> {
    let step_x = layout.panel_width_px + layout.spacing_px;
    let step_y = layout.panel_height_px + layout.spacing_px;
    let (width, height) = (layout.panel_width_px, layout.panel_height_px);
    let grid_w = span(layout.panels_wide, width, layout.spacing_px);
    let grid_h = span(layout.panels_high, height, layout.spacing_px);
    let start_x = bbox.min_x + (bbox.width - grid_w) / 2.0;
    let start_y = bbox.min_y + (bbox.height - grid_h) / 2.0;
    let cols = layout.panels_wide;

    (0..layout.panels_high).flat_map(move |row| {
        (0..cols).map(move |col| PanelCell {
            x: start_x + col as f64 * step_x,
            y: start_y + row as f64 * step_y,
            width,
            height,
        })
    })
}

fn span(count: u32, size: f64, spacing: f64) -> f64 {
    if count == 0 {
        0.0
    } else {
        count as f64 * size + (count - 1) as f64 * spacing
    }
}

/// Largest grid the containment pass will walk.
pub const MAX_EXACT_CELLS: u64 = 250_000;

fn cell_count(layout: &PanelLayout) -> u64 {
    u64::from(layout.panels_wide) * u64::from(layout.panels_high)
}

/// Grid slots whose centre falls inside the outline.
///
/// Empty when the grid has more than [`MAX_EXACT_CELLS`] slots.
pub fn placed_panels(points: &[Point], bbox: &BoundingBox, layout: &PanelLayout) -> Vec<PanelCell> {
    if cell_count(layout) > MAX_EXACT_CELLS {
        return Vec::new();
    }
    grid_cells(bbox, layout)
        .filter(|cell| {
            let c = cell.center();
            point_in_polygon(c.x, c.y, points)
        })
        .collect()
}

/// Full packing pass for one outline.
///
/// In [`PackingMode::Exact`] the containment count replaces the estimate when
/// it is lower, unless the grid exceeds [`MAX_EXACT_CELLS`]. Any outline with
/// positive area ends up with at least one panel.
pub fn pack_panels(
    points: &[Point],
    bbox: &BoundingBox,
    area_px: f64,
    orientation: Orientation,
    mode: PackingMode,
    config: &SolarConfig,
) -> PanelLayout {
    let mut layout = grid_layout(bbox, area_px, orientation, config);

    if mode == PackingMode::Exact {
        let cells = cell_count(&layout);
        if cells > MAX_EXACT_CELLS {
            warn!("grid too large for exact packing, keeping estimate. cells: {}", cells);
        } else {
            let exact = placed_panels(points, bbox, &layout).len() as u32;
            debug!(
                "exact panel count. estimate: {}, exact: {}",
                layout.estimated_panels, exact
            );
            if exact < layout.estimated_panels {
                layout.estimated_panels = exact;
            }
        }
    }

    if area_px > 0.0 && layout.estimated_panels == 0 {
        warn!("no whole panel fits a roof with positive area, counting one");
        layout.estimated_panels = 1;
    }
    layout
}

/// Panels to draw for a derived layout: contained slots, at most as many as
/// were counted. A roof kept at one panel by the floor may show none.
pub fn preview_cells(points: &[Point], bbox: &BoundingBox, layout: &PanelLayout) -> Vec<PanelCell> {
    let mut cells = placed_panels(points, bbox, layout);
    cells.truncate(layout.estimated_panels as usize);
    cells
}
