//! Series for the external charting library.
//!
//! The frontend draws line and bar charts from these structures; nothing
//! here renders.

use serde::Serialize;

use crate::domain::{DAYS_PER_WEEK, weekday_from_index, weekday_label};
use crate::ledger::{BudgetStatus, WeeklyLedger};
use crate::weight_history::WeightHistory;

/// Per-day series for the weekly calorie chart, Monday first.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyChart {
    pub labels: Vec<&'static str>,
    pub intake: Vec<f64>,
    pub exercise: Vec<f64>,
    pub net: Vec<f64>,
    pub remaining: Vec<f64>,
    pub status: Vec<BudgetStatus>,
    /// Flat goal line.
    pub goal: Vec<f64>,
}

impl WeeklyChart {
    pub fn from_ledger(ledger: &WeeklyLedger, daily_goal: f64) -> Self {
        let days = ledger.days();
        let labels = (0..DAYS_PER_WEEK)
            .filter_map(|i| weekday_from_index(i).ok())
            .map(weekday_label)
            .collect();
        let net: Vec<f64> = days.iter().map(|d| d.net()).collect();
        let remaining: Vec<f64> = net.iter().map(|n| daily_goal - n).collect();

        Self {
            labels,
            intake: days.iter().map(|d| d.calories_consumed()).collect(),
            exercise: days.iter().map(|d| d.calories_burned()).collect(),
            status: remaining
                .iter()
                .map(|r| BudgetStatus::from_remaining(*r))
                .collect(),
            net,
            remaining,
            goal: vec![daily_goal; DAYS_PER_WEEK],
        }
    }
}

/// Weight trend line with the goal weight as a reference line.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeightTrendChart {
    pub labels: Vec<String>,
    pub weights: Vec<f64>,
    pub goal: Option<f64>,
}

impl WeightTrendChart {
    pub fn from_history(history: &WeightHistory, goal_weight: Option<f64>) -> Self {
        Self {
            labels: history.entries().iter().map(|e| e.date.to_string()).collect(),
            weights: history.entries().iter().map(|e| e.weight).collect(),
            goal: goal_weight,
        }
    }
}

/// Everything the dashboard charts need in one payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartData {
    pub weekly: WeeklyChart,
    pub weight: WeightTrendChart,
}
