//! Query-string handoff between the onboarding, planner and exercise pages.
//!
//! Parameter names are fixed: `bmr`, `tdee`, `weight`, `goal`, `time` and,
//! on the planner→exercise hop, `dailyGoal`. Integer parameters are read
//! with leading-integer semantics (`"2556.7"` reads as 2556); float
//! parameters with leading-float semantics (`"70kg"` reads as 70).

use serde::{Deserialize, Serialize};
use url::form_urlencoded;

use crate::error::ValidationError;
use crate::formulas::{calculate_daily_deficit, calculate_daily_goal, round_kcal};
use crate::profile::UserProfile;

/// Values carried in the planner URL, also persisted so a reopened planner
/// keeps its targets.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannerParams {
    pub bmr: i64,
    pub tdee: i64,
    /// Current weight in kg.
    pub weight: f64,
    /// Goal weight in kg.
    pub goal: f64,
    /// Time to goal in weeks.
    pub time: f64,
    #[serde(default)]
    pub daily_goal: Option<i64>,
}

impl PlannerParams {
    pub fn from_profile(profile: &UserProfile) -> Self {
        Self {
            bmr: profile.bmr,
            tdee: profile.tdee,
            weight: profile.weight_kg,
            goal: profile.goal_weight_kg,
            time: profile.duration_weeks,
            daily_goal: None,
        }
    }

    /// Copy carrying the daily goal, for the exercise page.
    pub fn with_daily_goal(mut self) -> Self {
        self.daily_goal = Some(self.effective_daily_goal());
        self
    }

    /// The handed-off daily goal, or `tdee - deficit(weight, goal, time)`.
    pub fn effective_daily_goal(&self) -> i64 {
        self.daily_goal.unwrap_or_else(|| {
            let deficit = calculate_daily_deficit(self.weight, self.goal, self.time);
            round_kcal(calculate_daily_goal(self.tdee as f64, deficit))
        })
    }

    pub fn to_query(&self) -> String {
        let mut query = form_urlencoded::Serializer::new(String::new());
        query
            .append_pair("bmr", &self.bmr.to_string())
            .append_pair("tdee", &self.tdee.to_string())
            .append_pair("weight", &self.weight.to_string())
            .append_pair("goal", &self.goal.to_string())
            .append_pair("time", &self.time.to_string());
        if let Some(daily_goal) = self.daily_goal {
            query.append_pair("dailyGoal", &daily_goal.to_string());
        }
        query.finish()
    }

    /// Parses a query string, with or without the leading `?`.
    pub fn from_query(query: &str) -> Result<Self, ValidationError> {
        let query = query.trim().trim_start_matches('?');
        let mut bmr = None;
        let mut tdee = None;
        let mut weight = None;
        let mut goal = None;
        let mut time = None;
        let mut daily_goal = None;

        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                "bmr" => bmr = Some(parse_int("bmr", &value)?),
                "tdee" => tdee = Some(parse_int("tdee", &value)?),
                "weight" => weight = Some(parse_float("weight", &value)?),
                "goal" => goal = Some(parse_float("goal", &value)?),
                "time" => time = Some(parse_float("time", &value)?),
                "dailyGoal" => daily_goal = Some(parse_int("dailyGoal", &value)?),
                other => log::debug!("Ignoring unknown planner parameter {}", other),
            }
        }

        let time = time.ok_or(ValidationError::Missing("time"))?;
        if time <= 0.0 {
            return Err(ValidationError::NotPositive {
                field: "time",
                value: time,
            });
        }

        Ok(Self {
            bmr: bmr.ok_or(ValidationError::Missing("bmr"))?,
            tdee: tdee.ok_or(ValidationError::Missing("tdee"))?,
            weight: weight.ok_or(ValidationError::Missing("weight"))?,
            goal: goal.ok_or(ValidationError::Missing("goal"))?,
            time,
            daily_goal,
        })
    }
}

/// Reads an optional sign and the digits that follow it.
fn parse_int(field: &'static str, raw: &str) -> Result<i64, ValidationError> {
    let s = raw.trim_start();
    let sign_len = usize::from(s.starts_with(['+', '-']));
    let digits = s[sign_len..]
        .bytes()
        .take_while(u8::is_ascii_digit)
        .count();
    s[..sign_len + digits]
        .parse::<i64>()
        .map_err(|_| ValidationError::NotANumber {
            field,
            value: raw.to_string(),
        })
}

/// Reads the longest prefix that is a finite float.
fn parse_float(field: &'static str, raw: &str) -> Result<f64, ValidationError> {
    let s = raw.trim_start();
    let candidate = s
        .char_indices()
        .map(|(i, c)| i + c.len_utf8())
        .rev()
        .filter_map(|end| s[..end].parse::<f64>().ok())
        .find(|v| v.is_finite());
    candidate.ok_or_else(|| ValidationError::NotANumber {
        field,
        value: raw.to_string(),
    })
}
