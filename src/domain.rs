//! Domain types for the weekly planner.

use std::str::FromStr;

use chrono::Weekday;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{LedgerError, ValidationError};

/// Number of days in a planner week.
pub const DAYS_PER_WEEK: usize = 7;

/// Grouping tag for a logged line item.
///
/// The tag only drives grouping in views; calorie sign comes from the entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
    Exercise,
}

impl MealType {
    /// Returns all meal types in display order.
    pub fn all() -> &'static [MealType] {
        &[
            MealType::Breakfast,
            MealType::Lunch,
            MealType::Dinner,
            MealType::Snack,
            MealType::Exercise,
        ]
    }

    /// Returns the identifier used in stored data and URLs.
    pub fn id(&self) -> &'static str {
        match self {
            MealType::Breakfast => "breakfast",
            MealType::Lunch => "lunch",
            MealType::Dinner => "dinner",
            MealType::Snack => "snack",
            MealType::Exercise => "exercise",
        }
    }

    /// Returns the display name for the meal type.
    pub fn display_name(&self) -> &'static str {
        match self {
            MealType::Breakfast => "Breakfast",
            MealType::Lunch => "Lunch",
            MealType::Dinner => "Dinner",
            MealType::Snack => "Snack",
            MealType::Exercise => "Exercise",
        }
    }
}

impl FromStr for MealType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "breakfast" => Ok(MealType::Breakfast),
            "lunch" => Ok(MealType::Lunch),
            "dinner" => Ok(MealType::Dinner),
            "snack" | "snacks" => Ok(MealType::Snack),
            "exercise" => Ok(MealType::Exercise),
            _ => Err(ValidationError::UnknownChoice {
                field: "type",
                value: s.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for MealType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id())
    }
}

/// A single logged food or exercise entry.
///
/// `cal` is signed: positive for intake, negative for exercise burn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub name: String,
    pub cal: f64,
    #[serde(rename = "type")]
    pub meal_type: MealType,
}

impl LineItem {
    /// Creates an intake entry carrying `+calories`.
    pub fn consumed(name: impl Into<String>, calories: f64, meal_type: MealType) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            cal: calories,
            meal_type,
        }
    }

    /// Creates a burn entry carrying `-calories`.
    pub fn burned(name: impl Into<String>, calories: f64, meal_type: MealType) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            cal: -calories,
            meal_type,
        }
    }

    /// True when the entry records exercise burn.
    pub fn is_burn(&self) -> bool {
        self.cal < 0.0
    }
}

/// Ledger for a single weekday.
///
/// Totals are derived from `entries` on every read, so the consumed/burned
/// scalars always equal the signed entry sums.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DayLedger {
    pub entries: Vec<LineItem>,
}

impl DayLedger {
    /// Sum of positive entry calories.
    pub fn calories_consumed(&self) -> f64 {
        self.entries
            .iter()
            .filter(|e| e.cal > 0.0)
            .fold(0.0, |acc, e| acc + e.cal)
    }

    /// Sum of burned calories as a positive magnitude.
    pub fn calories_burned(&self) -> f64 {
        self.entries
            .iter()
            .filter(|e| e.cal < 0.0)
            .fold(0.0, |acc, e| acc + -e.cal)
    }

    /// Consumed minus burned.
    pub fn net(&self) -> f64 {
        self.calories_consumed() - self.calories_burned()
    }

    /// Entries with the given tag, in insertion order.
    pub fn entries_of(&self, meal_type: MealType) -> impl Iterator<Item = &LineItem> {
        self.entries.iter().filter(move |e| e.meal_type == meal_type)
    }
}

/// Converts a Monday-based index (0..=6) into a weekday.
pub fn weekday_from_index(index: usize) -> Result<Weekday, LedgerError> {
    u8::try_from(index)
        .ok()
        .and_then(|i| Weekday::try_from(i).ok())
        .ok_or(LedgerError::DayOutOfRange(index))
}

/// Monday-based index for a weekday.
pub fn weekday_index(day: Weekday) -> usize {
    day.num_days_from_monday() as usize
}

/// Short label used by charts and tables.
pub fn weekday_label(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Mon",
        Weekday::Tue => "Tue",
        Weekday::Wed => "Wed",
        Weekday::Thu => "Thu",
        Weekday::Fri => "Fri",
        Weekday::Sat => "Sat",
        Weekday::Sun => "Sun",
    }
}
