use std::fmt;

use log::{debug, info};
use serde::Serialize;

use crate::config::SolarConfig;
use crate::error::RoofError;
use crate::geometry::Point;
use crate::packing::{PackingMode, PanelCell, preview_cells};
use crate::roof::{OrientationUpdate, Roof};
use crate::roof_color;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Sums over every roof in the store.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoofTotals {
    pub roofs: usize,
    pub area_meters: f64,
    pub estimated_panels: u64,
    #[serde(rename = "systemSizeKW")]
    pub system_size_kw: f64,
    #[serde(rename = "dailyProductionKWh")]
    pub daily_production_kwh: f64,
    #[serde(rename = "annualProductionKWh")]
    pub annual_production_kwh: f64,
    #[serde(rename = "annualCO2OffsetKg")]
    pub annual_co2_offset_kg: f64,
}

type Listener = Box<dyn FnMut()>;

/// Ordered roof collection.
///
/// Every mutation re-derives only the roof it touched and then notifies the
/// subscribers, which carry no payload and are expected to query the store.
pub struct RoofStore {
    config: SolarConfig,
    mode: PackingMode,
    roofs: Vec<Roof>,
    colors_assigned: usize,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_subscription: u64,
}

impl fmt::Debug for RoofStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoofStore")
            .field("config", &self.config)
            .field("mode", &self.mode)
            .field("roofs", &self.roofs)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl RoofStore {
    pub fn new(config: SolarConfig) -> Self {
        Self {
            config,
            mode: PackingMode::default(),
            roofs: Vec::new(),
            colors_assigned: 0,
            listeners: Vec::new(),
            next_subscription: 0,
        }
    }

    pub fn config(&self) -> &SolarConfig {
        &self.config
    }

    pub fn packing_mode(&self) -> PackingMode {
        self.mode
    }

    pub fn roofs(&self) -> &[Roof] {
        &self.roofs
    }

    pub fn roof(&self, index: usize) -> Option<&Roof> {
        self.roofs.get(index)
    }

    pub fn len(&self) -> usize {
        self.roofs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roofs.is_empty()
    }

    /// Validate, derive and append a new roof. Returns its index.
    pub fn add_roof(&mut self, points: Vec<Point>) -> Result<usize, RoofError> {
        let color = roof_color(self.colors_assigned);
        let roof = Roof::new(points, color, self.mode, &self.config)?;
        self.colors_assigned += 1;
        self.roofs.push(roof);
        let index = self.roofs.len() - 1;
        info!("roof added. index: {}, color: {}", index, color);
        self.notify();
        Ok(index)
    }

    /// Move one vertex and re-derive that roof.
    pub fn update_point(
        &mut self,
        roof_index: usize,
        point_index: usize,
        point: Point,
    ) -> Result<(), RoofError> {
        let (mode, config) = (self.mode, &self.config);
        let roof = self
            .roofs
            .get_mut(roof_index)
            .ok_or(RoofError::NoSuchRoof { index: roof_index })?;
        let target = roof.point_mut(point_index).ok_or(RoofError::NoSuchPoint {
            roof: roof_index,
            index: point_index,
        })?;
        *target = point;
        roof.recompute(mode, config);
        self.notify();
        Ok(())
    }

    pub fn update_orientation(
        &mut self,
        roof_index: usize,
        update: &OrientationUpdate,
    ) -> Result<(), RoofError> {
        let (mode, config) = (self.mode, &self.config);
        let roof = self
            .roofs
            .get_mut(roof_index)
            .ok_or(RoofError::NoSuchRoof { index: roof_index })?;
        roof.apply(update);
        roof.recompute(mode, config);
        debug!("roof orientation updated. index: {}, update: {:?}", roof_index, update);
        self.notify();
        Ok(())
    }

    /// Record the pitch/direction answers for a roof. Display only.
    pub fn set_tags(
        &mut self,
        roof_index: usize,
        pitch: Option<String>,
        direction: Option<String>,
    ) -> Result<(), RoofError> {
        let roof = self
            .roofs
            .get_mut(roof_index)
            .ok_or(RoofError::NoSuchRoof { index: roof_index })?;
        if pitch.is_some() {
            roof.pitch = pitch;
        }
        if direction.is_some() {
            roof.direction = direction;
        }
        self.notify();
        Ok(())
    }

    pub fn delete_roof(&mut self, index: usize) -> Result<Roof, RoofError> {
        if index >= self.roofs.len() {
            return Err(RoofError::NoSuchRoof { index });
        }
        let roof = self.roofs.remove(index);
        info!("roof deleted. index: {}, remaining: {}", index, self.roofs.len());
        self.after_removal();
        Ok(roof)
    }

    /// Remove the most recently added roof.
    pub fn pop_roof(&mut self) -> Option<Roof> {
        let roof = self.roofs.pop()?;
        info!("last roof removed. remaining: {}", self.roofs.len());
        self.after_removal();
        Some(roof)
    }

    pub fn clear(&mut self) {
        self.roofs.clear();
        self.after_removal();
    }

    fn after_removal(&mut self) {
        if self.roofs.is_empty() {
            self.colors_assigned = 0;
        }
        self.notify();
    }

    /// Switch packing mode and re-derive every roof under it.
    pub fn set_packing_mode(&mut self, mode: PackingMode) {
        if self.mode == mode {
            return;
        }
        info!("packing mode changed. mode: {:?}", mode);
        self.mode = mode;
        for roof in &mut self.roofs {
            roof.recompute(mode, &self.config);
        }
        self.notify();
    }

    /// Panel rectangles for the layout preview of one roof.
    ///
    /// Requesting a preview switches the store to exact packing. Never shows
    /// more panels than are counted; a roof held at one panel by the floor
    /// shows none.
    pub fn preview_layout(&mut self, roof_index: usize) -> Result<Vec<PanelCell>, RoofError> {
        if roof_index >= self.roofs.len() {
            return Err(RoofError::NoSuchRoof { index: roof_index });
        }
        self.set_packing_mode(PackingMode::Exact);
        let roof = &self.roofs[roof_index];
        let metrics = roof.metrics();
        Ok(preview_cells(
            roof.points(),
            &metrics.bounding_box,
            &metrics.panel_layout,
        ))
    }

    pub fn aggregate(&self) -> RoofTotals {
        self.roofs.iter().fold(
            RoofTotals::default(),
            |mut totals, roof| {
                let m = roof.metrics();
                totals.roofs += 1;
                totals.area_meters += m.area_meters;
                totals.estimated_panels += u64::from(m.estimated_panels());
                totals.system_size_kw += m.energy.system_size_kw;
                totals.daily_production_kwh += m.energy.daily_production_kwh;
                totals.annual_production_kwh += m.energy.annual_production_kwh;
                totals.annual_co2_offset_kg += m.energy.annual_co2_offset_kg;
                totals
            },
        )
    }

    pub fn subscribe(&mut self, listener: impl FnMut() + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(existing, _)| *existing != id);
        self.listeners.len() != before
    }

    fn notify(&mut self) {
        for (_, listener) in &mut self.listeners {
            listener();
        }
    }
}
