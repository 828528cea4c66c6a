use std::fmt;

use log::{info, warn};
use serde::Serialize;

use crate::config::SolarConfig;
use crate::error::{RoofError, SessionError};
use crate::geometry::Point;
use crate::packing::PanelCell;
use crate::roof::{OrientationUpdate, Roof, nearest_within};
use crate::store::{RoofStore, RoofTotals, SubscriptionId};

#[derive(Clone, Debug, PartialEq)]
pub enum SessionState {
    Idle,
    /// Map is being positioned; pointer input belongs to the map widget.
    MapAdjusting,
    Drawing {
        points: Vec<Point>,
        hovering_close: bool,
        dragged: Option<usize>,
    },
    Editing {
        roof: usize,
        dragged: Option<usize>,
    },
    Completed,
}

impl SessionState {
    fn drawing() -> Self {
        SessionState::Drawing {
            points: Vec::new(),
            hovering_close: false,
            dragged: None,
        }
    }

    pub fn kind(&self) -> SessionStateKind {
        match self {
            SessionState::Idle => SessionStateKind::Idle,
            SessionState::MapAdjusting => SessionStateKind::MapAdjusting,
            SessionState::Drawing { .. } => SessionStateKind::Drawing,
            SessionState::Editing { .. } => SessionStateKind::Editing,
            SessionState::Completed => SessionStateKind::Completed,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionStateKind {
    Idle,
    MapAdjusting,
    Drawing,
    Editing,
    Completed,
}

impl fmt::Display for SessionStateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionStateKind::Idle => "idle",
            SessionStateKind::MapAdjusting => "adjusting the map",
            SessionStateKind::Drawing => "drawing",
            SessionStateKind::Editing => "editing a roof",
            SessionStateKind::Completed => "completed",
        };
        f.write_str(s)
    }
}

/// What a pointer event did.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum PointerOutcome {
    Ignored,
    PointAdded { count: usize },
    PolygonClosed { roof: usize },
    DragStarted { index: usize },
    Dragged,
    DragEnded,
    Hover { hovering_close: bool },
}

/// Drawing session: the roof store plus the pointer state machine that feeds it.
#[derive(Debug)]
pub struct Session {
    store: RoofStore,
    state: SessionState,
    active: Option<usize>,
    map_confirmed: bool,
}

impl Session {
    pub fn new(config: SolarConfig) -> Self {
        Self {
            store: RoofStore::new(config),
            state: SessionState::Idle,
            active: None,
            map_confirmed: false,
        }
    }

    pub fn store(&self) -> &RoofStore {
        &self.store
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Roof selected for point editing, if any.
    pub fn active_roof(&self) -> Option<usize> {
        self.active
    }

    pub fn in_progress_points(&self) -> &[Point] {
        match &self.state {
            SessionState::Drawing { points, .. } => points,
            _ => &[],
        }
    }

    pub fn aggregate(&self) -> RoofTotals {
        self.store.aggregate()
    }

    pub fn subscribe(&mut self, listener: impl FnMut() + 'static) -> SubscriptionId {
        self.store.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.store.unsubscribe(id)
    }

    fn transition(&mut self, next: SessionState) {
        let (from, to) = (self.state.kind(), next.kind());
        if from != to {
            info!("session transition. from: {:?}, to: {:?}", from, to);
        }
        self.state = next;
    }

    fn invalid(&self, action: &'static str) -> SessionError {
        let state = self.state.kind();
        warn!("rejected action. action: {}, state: {:?}", action, state);
        SessionError::InvalidTransition { action, state }
    }

    /// Address lookup succeeded; any outline in progress is dropped.
    pub fn search_succeeded(&mut self) {
        self.active = None;
        self.transition(SessionState::MapAdjusting);
    }

    pub fn confirm_map(&mut self) -> Result<(), SessionError> {
        if self.state != SessionState::MapAdjusting {
            return Err(self.invalid("confirm the map"));
        }
        self.map_confirmed = true;
        self.transition(SessionState::drawing());
        Ok(())
    }

    /// Start a fresh outline after finishing or completing earlier ones.
    pub fn add_another_roof(&mut self) -> Result<(), SessionError> {
        match self.state {
            SessionState::Idle | SessionState::Completed if self.map_confirmed => {
                self.active = None;
                self.transition(SessionState::drawing());
                Ok(())
            }
            SessionState::Drawing { .. } => Ok(()),
            _ => Err(self.invalid("add another roof")),
        }
    }

    pub fn pointer_down(&mut self, p: Point) -> Result<PointerOutcome, SessionError> {
        let close_radius = self.store.config().close_radius_px;
        let hit_radius = self.store.config().point_hit_radius_px;

        match &mut self.state {
            SessionState::Drawing {
                points,
                hovering_close,
                dragged,
            } => {
                if points.len() > 2 && points[0].distance_to(p) < close_radius {
                    let roof = self.commit()?;
                    return Ok(PointerOutcome::PolygonClosed { roof });
                }
                if let Some(index) = nearest_within(points, p, hit_radius) {
                    *hovering_close = false;
                    *dragged = Some(index);
                    return Ok(PointerOutcome::DragStarted { index });
                }
                points.push(p);
                Ok(PointerOutcome::PointAdded {
                    count: points.len(),
                })
            }
            SessionState::Editing { roof, dragged } => {
                let hit = self
                    .store
                    .roof(*roof)
                    .and_then(|r| r.hit_point(p, hit_radius));
                match hit {
                    Some(index) => {
                        *dragged = Some(index);
                        Ok(PointerOutcome::DragStarted { index })
                    }
                    None => Ok(PointerOutcome::Ignored),
                }
            }
            SessionState::Idle if self.map_confirmed && self.store.is_empty() => {
                self.transition(SessionState::Drawing {
                    points: vec![p],
                    hovering_close: false,
                    dragged: None,
                });
                Ok(PointerOutcome::PointAdded { count: 1 })
            }
            _ => Ok(PointerOutcome::Ignored),
        }
    }

    pub fn pointer_move(&mut self, p: Point) -> Result<PointerOutcome, SessionError> {
        let close_radius = self.store.config().close_radius_px;

        match &mut self.state {
            SessionState::Drawing {
                points,
                hovering_close,
                dragged,
            } => {
                if let Some(index) = *dragged
                    && let Some(point) = points.get_mut(index)
                {
                    *point = p;
                    return Ok(PointerOutcome::Dragged);
                }
                *hovering_close = points.len() > 2 && points[0].distance_to(p) < close_radius;
                Ok(PointerOutcome::Hover {
                    hovering_close: *hovering_close,
                })
            }
            SessionState::Editing {
                roof,
                dragged: Some(index),
            } => {
                let (roof, index) = (*roof, *index);
                self.store.update_point(roof, index, p)?;
                Ok(PointerOutcome::Dragged)
            }
            _ => Ok(PointerOutcome::Ignored),
        }
    }

    pub fn pointer_up(&mut self) -> PointerOutcome {
        match &mut self.state {
            SessionState::Drawing { dragged, .. } | SessionState::Editing { dragged, .. }
                if dragged.is_some() =>
            {
                *dragged = None;
                PointerOutcome::DragEnded
            }
            _ => PointerOutcome::Ignored,
        }
    }

    /// Close the outline in progress, same as tapping its first point.
    pub fn close_polygon(&mut self) -> Result<usize, SessionError> {
        match &self.state {
            SessionState::Drawing { points, .. } if points.len() < 3 => {
                warn!("outline too short to close. points: {}", points.len());
                Err(RoofError::TooFewPoints {
                    count: points.len(),
                }
                .into())
            }
            SessionState::Drawing { .. } => self.commit(),
            _ => Err(self.invalid("close an outline")),
        }
    }

    fn commit(&mut self) -> Result<usize, SessionError> {
        let points = match &mut self.state {
            SessionState::Drawing { points, .. } => std::mem::take(points),
            _ => return Err(self.invalid("close an outline")),
        };
        match self.store.add_roof(points) {
            Ok(index) => {
                self.active = Some(index);
                self.transition(SessionState::Idle);
                Ok(index)
            }
            Err(e) => {
                // add_roof only rejects short outlines, which never reach here
                self.transition(SessionState::drawing());
                Err(e.into())
            }
        }
    }

    /// Start point editing on a committed roof. An outline in progress is dropped.
    pub fn edit_roof(&mut self, index: usize) -> Result<(), SessionError> {
        if self.state == SessionState::MapAdjusting {
            return Err(self.invalid("edit a roof"));
        }
        if self.store.roof(index).is_none() {
            return Err(RoofError::NoSuchRoof { index }.into());
        }
        self.active = Some(index);
        self.transition(SessionState::Editing {
            roof: index,
            dragged: None,
        });
        Ok(())
    }

    pub fn done_editing(&mut self) -> Result<(), SessionError> {
        if !matches!(self.state, SessionState::Editing { .. }) {
            return Err(self.invalid("finish editing"));
        }
        self.active = None;
        self.transition(SessionState::Idle);
        Ok(())
    }

    /// Drop the outline in progress, or failing that the most recent roof.
    pub fn clear(&mut self) -> Option<Roof> {
        if let SessionState::Drawing { points, .. } = &self.state
            && !points.is_empty()
        {
            self.transition(SessionState::drawing());
            return None;
        }
        let removed_index = self.store.len().checked_sub(1)?;
        let removed = self.store.pop_roof();
        self.after_removal(removed_index);
        removed
    }

    pub fn delete_roof(&mut self, index: usize) -> Result<Roof, SessionError> {
        let roof = self.store.delete_roof(index)?;
        self.after_removal(index);
        if self.store.is_empty() {
            self.transition(SessionState::Idle);
        }
        Ok(roof)
    }

    fn after_removal(&mut self, removed: usize) {
        self.active = None;
        if let SessionState::Editing { roof, dragged } = &mut self.state {
            if *roof == removed {
                self.transition(SessionState::Idle);
            } else {
                if *roof > removed {
                    *roof -= 1;
                }
                *dragged = None;
                self.active = Some(*roof);
            }
        }
        if self.store.is_empty() && self.state == SessionState::Completed {
            self.transition(SessionState::Idle);
        }
    }

    /// Finish the whole job; needs at least one committed roof.
    pub fn complete(&mut self) -> Result<(), SessionError> {
        if self.store.is_empty() {
            warn!("complete requested without roofs");
            return Err(SessionError::NoRoofs);
        }
        if self.state == SessionState::MapAdjusting {
            return Err(self.invalid("complete"));
        }
        self.active = None;
        self.transition(SessionState::Completed);
        Ok(())
    }

    /// Remove every roof and start over.
    pub fn reset(&mut self) {
        self.store.clear();
        self.active = None;
        self.transition(SessionState::Idle);
    }

    pub fn update_orientation(
        &mut self,
        index: usize,
        update: &OrientationUpdate,
    ) -> Result<(), SessionError> {
        Ok(self.store.update_orientation(index, update)?)
    }

    pub fn set_roof_tags(
        &mut self,
        index: usize,
        pitch: Option<String>,
        direction: Option<String>,
    ) -> Result<(), SessionError> {
        Ok(self.store.set_tags(index, pitch, direction)?)
    }

    pub fn preview_layout(
        &mut self,
        index: usize,
    ) -> Result<Vec<PanelCell>, SessionError> {
        Ok(self.store.preview_layout(index)?)
    }

    /// Short instruction for the current step.
    pub fn hint(&self) -> &'static str {
        match &self.state {
            SessionState::Idle if self.store.is_empty() && !self.map_confirmed => {
                "Search for your address first."
            }
            SessionState::Idle if self.store.is_empty() => {
                "Click a corner of your roof to start drawing."
            }
            SessionState::Idle => "Add another roof, edit a roof, or click Done.",
            SessionState::MapAdjusting => "Move the map so your roof is centred, then continue.",
            SessionState::Drawing { points, .. } => match points.len() {
                0 => "Click a corner of your roof to start drawing.",
                1 | 2 => "Keep clicking around the roof perimeter.",
                _ => "Click the first point to complete the outline.",
            },
            SessionState::Editing { .. } => "Drag the points to adjust the shape, then click Done.",
            SessionState::Completed => "Roof drawing completed. Review your summary.",
        }
    }
}

#[cfg(test)]
mod session_tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use rstest::{fixture, rstest};

    use super::*;

    #[fixture]
    fn drawing() -> Session {
        let mut session = Session::new(SolarConfig::default());
        session.search_succeeded();
        session.confirm_map().unwrap();
        session
    }

    fn tap(session: &mut Session, x: f64, y: f64) -> PointerOutcome {
        session.pointer_down(Point::new(x, y)).unwrap()
    }

    fn trace_square(session: &mut Session) -> usize {
        tap(session, 100.0, 100.0);
        tap(session, 300.0, 100.0);
        tap(session, 300.0, 300.0);
        tap(session, 100.0, 300.0);
        match tap(session, 102.0, 101.0) {
            PointerOutcome::PolygonClosed { roof } => roof,
            other => panic!("expected close, got {other:?}"),
        }
    }

    #[test]
    fn test_search_then_confirm_enters_drawing() {
        let mut session = Session::new(SolarConfig::default());
        assert_eq!(session.state().kind(), SessionStateKind::Idle);
        assert!(session.confirm_map().is_err());

        session.search_succeeded();
        assert_eq!(session.state().kind(), SessionStateKind::MapAdjusting);
        assert_eq!(tap(&mut session, 5.0, 5.0), PointerOutcome::Ignored);

        session.confirm_map().unwrap();
        assert_eq!(session.in_progress_points(), &[] as &[Point]);
        assert_eq!(session.state().kind(), SessionStateKind::Drawing);
    }

    #[rstest]
    fn test_trace_and_close(mut drawing: Session) {
        let count = Rc::new(Cell::new(0));
        let c = count.clone();
        drawing.subscribe(move || c.set(c.get() + 1));

        assert_eq!(tap(&mut drawing, 100.0, 100.0), PointerOutcome::PointAdded { count: 1 });
        assert_eq!(tap(&mut drawing, 300.0, 100.0), PointerOutcome::PointAdded { count: 2 });
        tap(&mut drawing, 300.0, 300.0);
        tap(&mut drawing, 100.0, 300.0);
        assert_eq!(count.get(), 0);
        assert_eq!(
            tap(&mut drawing, 102.0, 101.0),
            PointerOutcome::PolygonClosed { roof: 0 }
        );

        assert_eq!(drawing.state(), &SessionState::Idle);
        assert_eq!(drawing.active_roof(), Some(0));
        assert_eq!(drawing.store().len(), 1);
        assert_eq!(drawing.store().roof(0).unwrap().points().len(), 4);
        assert_eq!(count.get(), 1);
    }

    #[rstest]
    fn test_tap_near_first_point_with_two_points_grabs_it(mut drawing: Session) {
        tap(&mut drawing, 100.0, 100.0);
        tap(&mut drawing, 300.0, 100.0);
        // inside both radii of the first point but only two points so far
        assert_eq!(
            tap(&mut drawing, 103.0, 100.0),
            PointerOutcome::DragStarted { index: 0 }
        );
        assert_eq!(drawing.store().len(), 0);
    }

    #[rstest]
    fn test_drag_in_progress_point(mut drawing: Session) {
        tap(&mut drawing, 100.0, 100.0);
        tap(&mut drawing, 300.0, 100.0);
        tap(&mut drawing, 300.0, 300.0);

        assert_eq!(
            tap(&mut drawing, 305.0, 295.0),
            PointerOutcome::DragStarted { index: 2 }
        );
        assert_eq!(
            drawing.pointer_move(Point::new(320.0, 320.0)).unwrap(),
            PointerOutcome::Dragged
        );
        assert_eq!(drawing.pointer_up(), PointerOutcome::DragEnded);
        assert_eq!(drawing.in_progress_points()[2], Point::new(320.0, 320.0));
        assert_eq!(drawing.pointer_up(), PointerOutcome::Ignored);
    }

    #[rstest]
    fn test_hover_over_close_handle(mut drawing: Session) {
        tap(&mut drawing, 100.0, 100.0);
        tap(&mut drawing, 300.0, 100.0);
        tap(&mut drawing, 300.0, 300.0);
        assert_eq!(
            drawing.pointer_move(Point::new(104.0, 100.0)).unwrap(),
            PointerOutcome::Hover { hovering_close: true }
        );
        assert_eq!(
            drawing.pointer_move(Point::new(200.0, 200.0)).unwrap(),
            PointerOutcome::Hover { hovering_close: false }
        );
    }

    #[rstest]
    fn test_drag_clears_close_highlight(mut drawing: Session) {
        tap(&mut drawing, 100.0, 100.0);
        tap(&mut drawing, 300.0, 100.0);
        tap(&mut drawing, 300.0, 300.0);
        drawing.pointer_move(Point::new(104.0, 100.0)).unwrap();

        assert_eq!(
            tap(&mut drawing, 302.0, 298.0),
            PointerOutcome::DragStarted { index: 2 }
        );
        drawing.pointer_move(Point::new(110.0, 110.0)).unwrap();
        assert!(matches!(
            drawing.state(),
            SessionState::Drawing {
                hovering_close: false,
                dragged: Some(2),
                ..
            }
        ));
    }

    #[test]
    fn test_pointer_outcome_json_keys() {
        let hover = serde_json::to_value(PointerOutcome::Hover { hovering_close: true }).unwrap();
        assert_eq!(hover, serde_json::json!({"kind": "hover", "hoveringClose": true}));
        let added = serde_json::to_value(PointerOutcome::PointAdded { count: 3 }).unwrap();
        assert_eq!(added, serde_json::json!({"kind": "pointAdded", "count": 3}));
    }

    #[rstest]
    fn test_close_polygon_needs_three_points(mut drawing: Session) {
        tap(&mut drawing, 100.0, 100.0);
        tap(&mut drawing, 300.0, 100.0);
        assert_eq!(
            drawing.close_polygon(),
            Err(SessionError::Roof(RoofError::TooFewPoints { count: 2 }))
        );
        assert_eq!(drawing.in_progress_points().len(), 2);
        assert_eq!(drawing.state().kind(), SessionStateKind::Drawing);

        tap(&mut drawing, 300.0, 300.0);
        assert_eq!(drawing.close_polygon(), Ok(0));
        assert_eq!(drawing.state(), &SessionState::Idle);
    }

    #[rstest]
    fn test_edit_drag_rederives_and_notifies(mut drawing: Session) {
        trace_square(&mut drawing);
        let area_before = drawing.store().roof(0).unwrap().metrics().area_pixels;
        let count = Rc::new(Cell::new(0));
        let c = count.clone();
        drawing.subscribe(move || c.set(c.get() + 1));

        drawing.edit_roof(0).unwrap();
        assert_eq!(drawing.active_roof(), Some(0));
        assert_eq!(tap(&mut drawing, 500.0, 500.0), PointerOutcome::Ignored);
        assert_eq!(
            tap(&mut drawing, 298.0, 302.0),
            PointerOutcome::DragStarted { index: 2 }
        );
        for step in 1..=4 {
            let p = Point::new(300.0 + 25.0 * step as f64, 300.0);
            drawing.pointer_move(p).unwrap();
        }
        drawing.pointer_up();

        let m = drawing.store().roof(0).unwrap().metrics();
        assert!(m.area_pixels > area_before);
        assert_eq!(count.get(), 4);
        // moves without a drag leave the roof alone
        assert_eq!(
            drawing.pointer_move(Point::new(0.0, 0.0)).unwrap(),
            PointerOutcome::Ignored
        );

        drawing.done_editing().unwrap();
        assert_eq!(drawing.state(), &SessionState::Idle);
        assert_eq!(drawing.active_roof(), None);
        assert!(drawing.done_editing().is_err());
    }

    #[rstest]
    fn test_edit_discards_in_progress_outline(mut drawing: Session) {
        trace_square(&mut drawing);
        drawing.add_another_roof().unwrap();
        tap(&mut drawing, 500.0, 500.0);
        drawing.edit_roof(0).unwrap();
        assert!(drawing.in_progress_points().is_empty());
        assert_eq!(
            drawing.edit_roof(7),
            Err(SessionError::Roof(RoofError::NoSuchRoof { index: 7 }))
        );
    }

    #[rstest]
    fn test_clear_drops_points_then_roofs(mut drawing: Session) {
        trace_square(&mut drawing);
        drawing.add_another_roof().unwrap();
        tap(&mut drawing, 500.0, 500.0);
        tap(&mut drawing, 600.0, 500.0);

        assert!(drawing.clear().is_none());
        assert_eq!(drawing.state().kind(), SessionStateKind::Drawing);
        assert!(drawing.in_progress_points().is_empty());
        assert_eq!(drawing.store().len(), 1);

        assert!(drawing.clear().is_some());
        assert!(drawing.store().is_empty());
        assert_eq!(drawing.state().kind(), SessionStateKind::Drawing);
        assert!(drawing.clear().is_none());
    }

    #[rstest]
    fn test_delete_last_roof_returns_to_idle(mut drawing: Session) {
        trace_square(&mut drawing);
        drawing.edit_roof(0).unwrap();
        drawing.delete_roof(0).unwrap();
        assert_eq!(drawing.state(), &SessionState::Idle);
        assert_eq!(drawing.active_roof(), None);
        assert_eq!(drawing.aggregate(), RoofTotals::default());

        // with nothing left, a tap starts a new outline
        assert_eq!(tap(&mut drawing, 10.0, 10.0), PointerOutcome::PointAdded { count: 1 });
    }

    #[rstest]
    fn test_delete_other_roof_keeps_editing_index_in_step(mut drawing: Session) {
        trace_square(&mut drawing);
        drawing.add_another_roof().unwrap();
        tap(&mut drawing, 500.0, 500.0);
        tap(&mut drawing, 700.0, 500.0);
        tap(&mut drawing, 600.0, 650.0);
        drawing.close_polygon().unwrap();

        drawing.edit_roof(1).unwrap();
        drawing.delete_roof(0).unwrap();
        assert_eq!(
            drawing.state(),
            &SessionState::Editing {
                roof: 0,
                dragged: None
            }
        );
        assert_eq!(drawing.active_roof(), Some(0));
    }

    #[rstest]
    fn test_complete_requires_a_roof(mut drawing: Session) {
        assert_eq!(drawing.complete(), Err(SessionError::NoRoofs));
        trace_square(&mut drawing);
        drawing.complete().unwrap();
        assert_eq!(drawing.state(), &SessionState::Completed);
        assert_eq!(tap(&mut drawing, 100.0, 100.0), PointerOutcome::Ignored);

        drawing.add_another_roof().unwrap();
        assert_eq!(drawing.state().kind(), SessionStateKind::Drawing);
    }

    #[rstest]
    fn test_idle_with_roofs_ignores_taps(mut drawing: Session) {
        trace_square(&mut drawing);
        assert_eq!(tap(&mut drawing, 150.0, 150.0), PointerOutcome::Ignored);
        assert_eq!(drawing.store().len(), 1);
    }

    #[rstest]
    fn test_search_drops_outline_but_keeps_roofs(mut drawing: Session) {
        trace_square(&mut drawing);
        drawing.add_another_roof().unwrap();
        tap(&mut drawing, 500.0, 500.0);
        drawing.search_succeeded();
        assert_eq!(drawing.state(), &SessionState::MapAdjusting);
        assert_eq!(drawing.store().len(), 1);
    }

    #[rstest]
    fn test_reset(mut drawing: Session) {
        trace_square(&mut drawing);
        drawing.reset();
        assert!(drawing.store().is_empty());
        assert_eq!(drawing.state(), &SessionState::Idle);
        assert_eq!(drawing.hint(), "Click a corner of your roof to start drawing.");
    }

    #[test]
    fn test_invalid_transition_message() {
        let mut session = Session::new(SolarConfig::default());
        let err = session.done_editing().unwrap_err();
        assert_eq!(err.to_string(), "Cannot finish editing while idle");
    }
}
