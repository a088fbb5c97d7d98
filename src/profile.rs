//! User profile and goal projection.
//!
//! Turns the onboarding form into a validated profile with derived BMR,
//! TDEE, daily deficit and daily calorie goal. Raw form values arrive as
//! strings; anything non-numeric, non-finite or non-positive is rejected
//! with a [`ValidationError`] naming the field.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::formulas::{
    calculate_bmr, calculate_daily_deficit, calculate_daily_goal, calculate_tdee,
    feet_inches_to_cm, kcal_to_kj, lb_to_kg, months_to_weeks, round_kcal,
};

/// Selector for the Mifflin-St Jeor offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    Male,
    Female,
}

impl FromStr for Sex {
    type Err = ValidationError;

    /// `male` selects the male formula; any other non-empty value the female one.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" => Err(ValidationError::Missing("sex")),
            "male" | "m" => Ok(Sex::Male),
            _ => Ok(Sex::Female),
        }
    }
}

/// Discrete activity levels offered by the onboarding form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityLevel {
    Sedentary,
    Light,
    Moderate,
    VeryActive,
    ExtraActive,
}

impl ActivityLevel {
    pub fn all() -> &'static [ActivityLevel] {
        &[
            ActivityLevel::Sedentary,
            ActivityLevel::Light,
            ActivityLevel::Moderate,
            ActivityLevel::VeryActive,
            ActivityLevel::ExtraActive,
        ]
    }

    pub fn multiplier(&self) -> f64 {
        match self {
            ActivityLevel::Sedentary => 1.2,
            ActivityLevel::Light => 1.375,
            ActivityLevel::Moderate => 1.55,
            ActivityLevel::VeryActive => 1.725,
            ActivityLevel::ExtraActive => 1.9,
        }
    }
}

impl FromStr for ActivityLevel {
    type Err = ValidationError;

    /// Accepts either a level name or one of the multiplier values the form posts.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::Missing("activity"));
        }
        if let Ok(value) = trimmed.parse::<f64>()
            && let Some(level) = ActivityLevel::all()
                .iter()
                .find(|l| (l.multiplier() - value).abs() < 1e-9)
        {
            return Ok(*level);
        }
        match trimmed.to_lowercase().replace(['-', ' '], "_").as_str() {
            "sedentary" => Ok(ActivityLevel::Sedentary),
            "light" | "lightly_active" => Ok(ActivityLevel::Light),
            "moderate" | "moderately_active" => Ok(ActivityLevel::Moderate),
            "very_active" | "active" => Ok(ActivityLevel::VeryActive),
            "extra_active" => Ok(ActivityLevel::ExtraActive),
            _ => Err(ValidationError::UnknownChoice {
                field: "activity",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeightUnit {
    #[default]
    Kg,
    Lb,
}

impl WeightUnit {
    pub fn to_kg(&self, value: f64) -> f64 {
        match self {
            WeightUnit::Kg => value,
            WeightUnit::Lb => lb_to_kg(value),
        }
    }
}

impl FromStr for WeightUnit {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "kg" | "kgs" => Ok(WeightUnit::Kg),
            "lb" | "lbs" => Ok(WeightUnit::Lb),
            _ => Err(ValidationError::UnknownChoice {
                field: "weightUnit",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HeightUnit {
    Cm,
    FeetInches,
}

impl FromStr for HeightUnit {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "cm" => Ok(HeightUnit::Cm),
            "ft" | "feet" | "ft_in" => Ok(HeightUnit::FeetInches),
            _ => Err(ValidationError::UnknownChoice {
                field: "heightUnit",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DurationUnit {
    Weeks,
    Months,
}

impl FromStr for DurationUnit {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "weeks" | "week" => Ok(DurationUnit::Weeks),
            "months" | "month" => Ok(DurationUnit::Months),
            _ => Err(ValidationError::UnknownChoice {
                field: "durationUnit",
                value: s.to_string(),
            }),
        }
    }
}

/// Raw onboarding form as posted by the client.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileForm {
    pub age: Option<String>,
    pub sex: Option<String>,
    pub weight: Option<String>,
    pub weight_unit: Option<String>,
    pub height: Option<String>,
    pub height_ft: Option<String>,
    pub height_in: Option<String>,
    pub height_unit: Option<String>,
    pub activity: Option<String>,
    pub goal_weight: Option<String>,
    pub goal_unit: Option<String>,
    pub duration: Option<String>,
    pub duration_unit: Option<String>,
}

/// Validated profile inputs, normalized to kg, cm and weeks.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileInput {
    pub age: u32,
    pub sex: Sex,
    pub weight_kg: f64,
    pub height_cm: f64,
    pub activity: ActivityLevel,
    pub goal_weight_kg: f64,
    pub duration_weeks: f64,
    pub weight_unit: WeightUnit,
    pub goal_unit: WeightUnit,
}

impl ProfileInput {
    /// Parses and validates the onboarding form.
    pub fn from_form(form: &ProfileForm) -> Result<Self, ValidationError> {
        let age = parse_age(form.age.as_deref())?;
        let sex = Sex::from_str(form.sex.as_deref().unwrap_or(""))?;
        let weight_unit = WeightUnit::from_str(form.weight_unit.as_deref().unwrap_or(""))?;
        let goal_unit = match form.goal_unit.as_deref() {
            Some(unit) if !unit.trim().is_empty() => WeightUnit::from_str(unit)?,
            _ => weight_unit,
        };

        let weight = parse_positive("weight", form.weight.as_deref())?;
        let goal_weight = parse_positive("goalWeight", form.goal_weight.as_deref())?;

        let height_cm = match HeightUnit::from_str(form.height_unit.as_deref().unwrap_or(""))? {
            HeightUnit::Cm => parse_positive("height", form.height.as_deref())?,
            HeightUnit::FeetInches => {
                let feet = parse_positive("heightFt", form.height_ft.as_deref())?;
                let inches = parse_non_negative("heightIn", form.height_in.as_deref())?;
                feet_inches_to_cm(feet, inches)
            }
        };

        let activity = ActivityLevel::from_str(form.activity.as_deref().unwrap_or(""))?;

        let duration = parse_positive("duration", form.duration.as_deref())?;
        let duration_weeks =
            match DurationUnit::from_str(form.duration_unit.as_deref().unwrap_or(""))? {
                DurationUnit::Weeks => duration,
                DurationUnit::Months => months_to_weeks(duration),
            };

        Ok(Self {
            age,
            sex,
            weight_kg: weight_unit.to_kg(weight),
            height_cm,
            activity,
            goal_weight_kg: goal_unit.to_kg(goal_weight),
            duration_weeks,
            weight_unit,
            goal_unit,
        })
    }
}

fn parse_number(field: &'static str, raw: Option<&str>) -> Result<f64, ValidationError> {
    let raw = raw.map(str::trim).filter(|s| !s.is_empty());
    let Some(raw) = raw else {
        return Err(ValidationError::Missing(field));
    };
    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(ValidationError::NotANumber {
            field,
            value: raw.to_string(),
        }),
    }
}

fn parse_positive(field: &'static str, raw: Option<&str>) -> Result<f64, ValidationError> {
    let value = parse_number(field, raw)?;
    if value <= 0.0 {
        return Err(ValidationError::NotPositive { field, value });
    }
    Ok(value)
}

fn parse_non_negative(field: &'static str, raw: Option<&str>) -> Result<f64, ValidationError> {
    if raw.map(str::trim).is_none_or(str::is_empty) {
        return Ok(0.0);
    }
    let value = parse_number(field, raw)?;
    if value < 0.0 {
        return Err(ValidationError::NotPositive { field, value });
    }
    Ok(value)
}

fn parse_age(raw: Option<&str>) -> Result<u32, ValidationError> {
    let raw = raw.map(str::trim).filter(|s| !s.is_empty());
    let Some(raw) = raw else {
        return Err(ValidationError::Missing("age"));
    };
    let age = raw.parse::<u32>().map_err(|_| ValidationError::NotANumber {
        field: "age",
        value: raw.to_string(),
    })?;
    if age == 0 {
        return Err(ValidationError::NotPositive {
            field: "age",
            value: 0.0,
        });
    }
    Ok(age)
}

/// Unrounded goal projection values in kcal/day.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GoalMetrics {
    pub bmr: f64,
    pub tdee: f64,
    pub daily_deficit: f64,
    pub daily_goal: f64,
}

impl GoalMetrics {
    pub fn compute(input: &ProfileInput) -> Self {
        let bmr = calculate_bmr(
            input.weight_kg,
            input.height_cm,
            input.age,
            input.sex == Sex::Male,
        );
        let tdee = calculate_tdee(bmr, input.activity.multiplier());
        let daily_deficit =
            calculate_daily_deficit(input.weight_kg, input.goal_weight_kg, input.duration_weeks);
        let daily_goal = calculate_daily_goal(tdee, daily_deficit);

        Self {
            bmr,
            tdee,
            daily_deficit,
            daily_goal,
        }
    }

    /// Display values: each kcal figure rounded on its own, kJ derived from
    /// the rounded kcal.
    pub fn rounded(&self) -> DisplayMetrics {
        let bmr = round_kcal(self.bmr);
        let tdee = round_kcal(self.tdee);
        let daily_deficit = round_kcal(self.daily_deficit);
        let daily_goal = round_kcal(self.daily_goal);

        DisplayMetrics {
            bmr,
            tdee,
            daily_deficit,
            daily_goal,
            bmr_kj: kcal_to_kj(bmr),
            tdee_kj: kcal_to_kj(tdee),
            daily_deficit_kj: kcal_to_kj(daily_deficit),
            daily_goal_kj: kcal_to_kj(daily_goal),
        }
    }
}

/// Rounded kcal and kJ values as shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayMetrics {
    pub bmr: i64,
    pub tdee: i64,
    pub daily_deficit: i64,
    pub daily_goal: i64,
    pub bmr_kj: i64,
    pub tdee_kj: i64,
    pub daily_deficit_kj: i64,
    pub daily_goal_kj: i64,
}

/// Persisted user profile, stored under `profile_<email>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub age: u32,
    pub sex: Sex,
    pub weight_kg: f64,
    pub height_cm: f64,
    pub activity: ActivityLevel,
    pub goal_weight_kg: f64,
    pub goal_weight_unit: WeightUnit,
    pub duration_weeks: f64,
    pub weight_unit: WeightUnit,
    pub start_weight_kg: f64,
    pub bmr: i64,
    pub tdee: i64,
    pub daily_deficit: i64,
    pub daily_goal: i64,
}

impl UserProfile {
    /// Builds a profile from validated input, keeping an earlier start weight
    /// when the profile is being re-saved.
    pub fn from_input(input: &ProfileInput, previous: Option<&UserProfile>) -> Self {
        let metrics = GoalMetrics::compute(input).rounded();
        Self {
            age: input.age,
            sex: input.sex,
            weight_kg: input.weight_kg,
            height_cm: input.height_cm,
            activity: input.activity,
            goal_weight_kg: input.goal_weight_kg,
            goal_weight_unit: input.goal_unit,
            duration_weeks: input.duration_weeks,
            weight_unit: input.weight_unit,
            start_weight_kg: previous.map_or(input.weight_kg, |p| p.start_weight_kg),
            bmr: metrics.bmr,
            tdee: metrics.tdee,
            daily_deficit: metrics.daily_deficit,
            daily_goal: metrics.daily_goal,
        }
    }

    /// Display metrics for the stored (already rounded) values.
    pub fn display_metrics(&self) -> DisplayMetrics {
        DisplayMetrics {
            bmr: self.bmr,
            tdee: self.tdee,
            daily_deficit: self.daily_deficit,
            daily_goal: self.daily_goal,
            bmr_kj: kcal_to_kj(self.bmr),
            tdee_kj: kcal_to_kj(self.tdee),
            daily_deficit_kj: kcal_to_kj(self.daily_deficit),
            daily_goal_kj: kcal_to_kj(self.daily_goal),
        }
    }

    /// Kilograms still to lose (negative once below goal).
    pub fn remaining_kg(&self) -> f64 {
        self.weight_kg - self.goal_weight_kg
    }
}
