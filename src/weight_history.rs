//! Weight history and goal completion projection.
//!
//! Keeps the most recent weigh-ins (one per calendar date) and projects when
//! the goal weight will be reached from the trailing rate of loss.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::store::{JsonStoreExt, KeyValueStore};

// === Constants ===

/// Maximum number of weigh-ins kept.
pub const MAX_ENTRIES: usize = 12;

/// Minimum weigh-ins needed to compute a rate.
pub const MIN_PROJECTION_ENTRIES: usize = 2;

// === Data Structures ===

/// A single weigh-in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeightEntry {
    pub date: NaiveDate,
    pub weight: f64,
    #[serde(default)]
    pub is_start_weight: bool,
}

/// Weigh-ins sorted by date, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct WeightHistory {
    entries: Vec<WeightEntry>,
}

impl WeightHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a history from arbitrary entries, applying the same rules as
    /// [`WeightHistory::record`].
    pub fn from_entries(entries: impl IntoIterator<Item = WeightEntry>) -> Self {
        let mut history = Self::new();
        for entry in entries {
            history.record(entry.date, entry.weight, entry.is_start_weight);
        }
        history
    }

    /// Records a weigh-in. A later write for the same date replaces the
    /// earlier one; only the newest [`MAX_ENTRIES`] dates are kept.
    pub fn record(&mut self, date: NaiveDate, weight: f64, is_start_weight: bool) {
        self.entries.retain(|e| e.date != date);
        self.entries.push(WeightEntry {
            date,
            weight,
            is_start_weight,
        });
        self.entries.sort_by_key(|e| e.date);
        if self.entries.len() > MAX_ENTRIES {
            let excess = self.entries.len() - MAX_ENTRIES;
            self.entries.drain(..excess);
        }
    }

    pub fn entries(&self) -> &[WeightEntry] {
        &self.entries
    }

    pub fn latest(&self) -> Option<&WeightEntry> {
        self.entries.last()
    }

    pub fn oldest(&self) -> Option<&WeightEntry> {
        self.entries.first()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Loads the history stored under `key`, re-applying ordering and caps.
    pub fn load<S: KeyValueStore + ?Sized>(store: &S, key: &str) -> Self {
        let entries: Vec<WeightEntry> = store.load_or(key, Vec::new());
        Self::from_entries(entries)
    }

    pub fn save<S: KeyValueStore + ?Sized>(&self, store: &mut S, key: &str) -> bool {
        store.save(key, self)
    }
}

/// Outcome of a completion projection.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum Projection {
    /// Latest weight is at or below the goal.
    GoalReached { latest_weight: f64 },

    /// Losing weight; goal expected on `projected_date`.
    OnTrack {
        total_change_kg: f64,
        time_span_days: i64,
        weekly_rate_kg: f64,
        weeks_to_goal: f64,
        projected_date: NaiveDate,
    },

    /// Weight is flat or rising, so no date can be projected.
    NotLosing {
        total_change_kg: f64,
        time_span_days: i64,
    },

    /// Losing too slowly for the goal date to fit in the calendar.
    Unprojectable {
        total_change_kg: f64,
        time_span_days: i64,
        weekly_rate_kg: f64,
    },
}

/// Reason a projection could not be computed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "error", content = "details")]
pub enum ProjectionError {
    #[serde(rename = "insufficient_entries")]
    InsufficientEntries { available: usize, required: usize },
}

impl std::fmt::Display for ProjectionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProjectionError::InsufficientEntries {
                available,
                required,
            } => {
                write!(f, "Need {} weigh-ins, found {}", required, available)
            }
        }
    }
}

impl std::error::Error for ProjectionError {}

/// Projects when `goal_weight` will be reached.
///
/// Rate is `|latest - oldest| / (span_days / 7)`; the goal date is
/// `today + round(weeks_to_goal × 7)` days.
pub fn project_completion(
    history: &WeightHistory,
    goal_weight: f64,
    today: NaiveDate,
) -> Result<Projection, ProjectionError> {
    let Some(latest) = history.latest() else {
        return Err(ProjectionError::InsufficientEntries {
            available: 0,
            required: MIN_PROJECTION_ENTRIES,
        });
    };

    let remaining = latest.weight - goal_weight;
    if remaining <= 0.0 {
        return Ok(Projection::GoalReached {
            latest_weight: latest.weight,
        });
    }

    if history.len() < MIN_PROJECTION_ENTRIES {
        return Err(ProjectionError::InsufficientEntries {
            available: history.len(),
            required: MIN_PROJECTION_ENTRIES,
        });
    }

    // Dates are unique, so two entries span at least one day
    let oldest = &history.entries()[0];
    let total_change_kg = latest.weight - oldest.weight;
    let time_span_days = (latest.date - oldest.date).num_days();

    if total_change_kg >= 0.0 {
        return Ok(Projection::NotLosing {
            total_change_kg,
            time_span_days,
        });
    }

    let weekly_rate_kg = total_change_kg.abs() / (time_span_days as f64 / 7.0);
    let weeks_to_goal = remaining / weekly_rate_kg;
    let Some(projected_date) = projected_date(today, weeks_to_goal) else {
        log::debug!(
            "Goal {:.1} weeks out at {:.6} kg/week, not projectable",
            weeks_to_goal,
            weekly_rate_kg
        );
        return Ok(Projection::Unprojectable {
            total_change_kg,
            time_span_days,
            weekly_rate_kg,
        });
    };

    Ok(Projection::OnTrack {
        total_change_kg,
        time_span_days,
        weekly_rate_kg,
        weeks_to_goal,
        projected_date,
    })
}

/// `today + round(weeks × 7)` days, or `None` past the end of the calendar.
fn projected_date(today: NaiveDate, weeks: f64) -> Option<NaiveDate> {
    let days = (weeks * 7.0).round();
    // NaN would cast to zero days
    if !days.is_finite() {
        return None;
    }
    let delta = Duration::try_days(days as i64)?;
    today.checked_add_signed(delta)
}

// === Unit Tests ===
