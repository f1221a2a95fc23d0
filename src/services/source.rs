use serde::{Deserialize, Serialize};

/// Why a source adapter served something other than a live reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DegradedReason {
    StaleCache,
    SeasonalDefault,
    NeutralDefault,
}

/// Outcome of a resilient fetch. Callers can tell fresh data, fallback
/// data, and a legitimately empty result apart without inspecting errors.
#[derive(Debug, Clone)]
pub enum SourceResult<T> {
    Fresh(T),
    Degraded { value: T, reason: DegradedReason },
    Empty,
}

impl<T> SourceResult<T> {
    pub fn value(&self) -> Option<&T> {
        match self {
            SourceResult::Fresh(v) | SourceResult::Degraded { value: v, .. } => Some(v),
            SourceResult::Empty => None,
        }
    }

    pub fn into_value(self) -> Option<T> {
        match self {
            SourceResult::Fresh(v) | SourceResult::Degraded { value: v, .. } => Some(v),
            SourceResult::Empty => None,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, SourceResult::Degraded { .. })
    }
}
