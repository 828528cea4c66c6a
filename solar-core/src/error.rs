use crate::session::SessionStateKind;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RoofError {
    #[error("A roof outline needs at least 3 points, got {count}")]
    TooFewPoints { count: usize },
    #[error("No roof at index {index}")]
    NoSuchRoof { index: usize },
    #[error("Roof {roof} has no point at index {index}")]
    NoSuchPoint { roof: usize, index: usize },
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Roof(#[from] RoofError),
    #[error("Outline at least one roof area first")]
    NoRoofs,
    #[error("Cannot {action} while {state}")]
    InvalidTransition {
        action: &'static str,
        state: SessionStateKind,
    },
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("{field} must be a finite number greater than zero, got {value}")]
    NotPositive { field: &'static str, value: f64 },
    #[error("{field} must be a finite number, zero or greater, got {value}")]
    Negative { field: &'static str, value: f64 },
    #[error("point_hit_radius_px ({hit}) must be larger than close_radius_px ({close})")]
    HitRadiusNotLarger { hit: f64, close: f64 },
}
