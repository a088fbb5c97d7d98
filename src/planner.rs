//! Planner controller.
//!
//! A [`PlannerSession`] owns the store, the signed-in user's profile, the
//! weekly ledger and the weight history. Form submissions come in as plain
//! structs, are validated, applied to the ledger, and written back to the
//! store straight away.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize, Serializer};
use uuid::Uuid;

use crate::catalog::{find_activity, find_ingredient};
use crate::chart::{ChartData, WeeklyChart, WeightTrendChart};
use crate::domain::{LineItem, MealType, weekday_from_index, weekday_label};
use crate::error::{PlannerError, ValidationError};
use crate::formulas::{
    BaseUnit, Intensity, PortionUnit, calculate_exercise_burn, calculate_portion_calories,
};
use crate::handoff::PlannerParams;
use crate::ledger::{BudgetStatus, WeeklyLedger, WeeklySummary, WeightChangeEstimate};
use crate::profile::{DisplayMetrics, ProfileForm, ProfileInput, UserProfile, WeightUnit};
use crate::store::{
    JsonStoreExt, KeyValueStore, PlannerKeys, profile_key, weight_history_key,
};
use crate::weight_history::{Projection, ProjectionError, WeightHistory, project_completion};

// === Forms ===

/// Manual food entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FoodForm {
    pub name: String,
    pub calories: f64,
    pub meal_type: MealType,
}

/// One ingredient line in the meal builder.
///
/// Names a catalog ingredient, or supplies `baseCalories`/`baseUnit` inline
/// for a custom one.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngredientLine {
    pub ingredient: String,
    pub base_calories: Option<f64>,
    pub base_unit: Option<BaseUnit>,
    pub quantity: f64,
    pub unit: PortionUnit,
}

/// Ingredient-based meal.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MealForm {
    pub name: String,
    pub meal_type: MealType,
    pub ingredients: Vec<IngredientLine>,
}

/// Exercise entry: a catalog activity or a raw MET value.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseForm {
    pub activity: Option<String>,
    pub met: Option<f64>,
    pub intensity: Intensity,
    pub minutes: f64,
}

// === Views ===

/// Calorie targets the planner works against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanTargets {
    pub bmr: i64,
    pub tdee: i64,
    pub daily_goal: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayView {
    pub index: usize,
    pub label: &'static str,
    pub entries: Vec<LineItem>,
    pub consumed: f64,
    pub burned: f64,
    pub net: f64,
    pub remaining: f64,
    pub status: BudgetStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekView {
    pub daily_goal: i64,
    pub days: Vec<DayView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryView {
    pub targets: PlanTargets,
    pub summary: WeeklySummary,
    pub estimate: WeightChangeEstimate,
}

/// Result of submitting the onboarding form.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileOutcome {
    pub profile: UserProfile,
    pub metrics: DisplayMetrics,
    /// Query string for the planner page.
    pub planner_query: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressView {
    pub goal_weight: f64,
    pub start_weight: Option<f64>,
    pub latest_weight: Option<f64>,
    #[serde(serialize_with = "serialize_projection")]
    pub projection: Result<Projection, ProjectionError>,
}

fn serialize_projection<Z: Serializer>(
    projection: &Result<Projection, ProjectionError>,
    serializer: Z,
) -> Result<Z::Ok, Z::Error> {
    match projection {
        Ok(projection) => projection.serialize(serializer),
        Err(e) => e.serialize(serializer),
    }
}

// === Session ===

pub struct PlannerSession<S> {
    store: S,
    user: Option<String>,
    keys: PlannerKeys,
    profile: Option<UserProfile>,
    params: Option<PlannerParams>,
    ledger: WeeklyLedger,
    history: WeightHistory,
}

impl<S: KeyValueStore> PlannerSession<S> {
    /// Opens a session for `user` (or the unkeyed single-user planner),
    /// restoring whatever the store holds.
    pub fn open(store: S, user: Option<String>) -> Self {
        let keys = PlannerKeys::for_user(user.as_deref());
        let mut session = Self {
            store,
            user,
            keys,
            profile: None,
            params: None,
            ledger: WeeklyLedger::new(),
            history: WeightHistory::new(),
        };
        session.reload_state();
        session
    }

    /// Re-reads profile, handoff targets, week and weight history from the store.
    pub fn reload_state(&mut self) {
        self.ledger = WeeklyLedger::load(&self.store, &self.keys);
        self.params = self.store.load(&self.keys.params);
        if let Some(user) = self.user.as_deref() {
            self.profile = self.store.load(&profile_key(user));
            self.history = WeightHistory::load(&self.store, &weight_history_key(user));
        }
        log::debug!(
            "Session state loaded (profile: {}, handoff: {}, weigh-ins: {})",
            self.profile.is_some(),
            self.params.is_some(),
            self.history.len()
        );
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    pub fn profile(&self) -> Option<&UserProfile> {
        self.profile.as_ref()
    }

    pub fn ledger(&self) -> &WeeklyLedger {
        &self.ledger
    }

    #[cfg(test)]
    pub fn history(&self) -> &WeightHistory {
        &self.history
    }

    /// Targets from the handoff parameters if present, else from the profile.
    pub fn targets(&self) -> Result<PlanTargets, PlannerError> {
        if let Some(params) = &self.params {
            return Ok(PlanTargets {
                bmr: params.bmr,
                tdee: params.tdee,
                daily_goal: params.effective_daily_goal(),
            });
        }
        self.profile
            .as_ref()
            .map(|p| PlanTargets {
                bmr: p.bmr,
                tdee: p.tdee,
                daily_goal: p.daily_goal,
            })
            .ok_or(PlannerError::MissingProfile)
    }

    /// Validates the onboarding form, derives metrics and saves the profile.
    ///
    /// The first submission also records the start weight.
    pub fn submit_profile(
        &mut self,
        form: &ProfileForm,
        today: NaiveDate,
    ) -> Result<ProfileOutcome, PlannerError> {
        let input = ProfileInput::from_form(form)?;
        let profile = UserProfile::from_input(&input, self.profile.as_ref());
        let metrics = profile.display_metrics();
        let params = PlannerParams::from_profile(&profile);

        log::info!(
            "Profile saved: bmr={} tdee={} daily_goal={}",
            metrics.bmr,
            metrics.tdee,
            metrics.daily_goal
        );

        if let Some(user) = self.user.clone() {
            self.store.save(&profile_key(&user), &profile);
            if self.history.is_empty() {
                self.history.record(today, profile.weight_kg, true);
                self.history.save(&mut self.store, &weight_history_key(&user));
            }
        } else if self.history.is_empty() {
            self.history.record(today, profile.weight_kg, true);
        }

        self.profile = Some(profile.clone());
        if self.params.take().is_some()
            && let Err(e) = self.store.remove_item(&self.keys.params)
        {
            log::warn!("Failed to clear planner targets: {}", e);
        }

        Ok(ProfileOutcome {
            profile,
            metrics,
            planner_query: params.to_query(),
        })
    }

    /// The saved profile with its display metrics and planner handoff.
    pub fn current_profile(&self) -> Result<ProfileOutcome, PlannerError> {
        let profile = self.profile.clone().ok_or(PlannerError::MissingProfile)?;
        Ok(ProfileOutcome {
            metrics: profile.display_metrics(),
            planner_query: PlannerParams::from_profile(&profile).to_query(),
            profile,
        })
    }

    /// Starts a fresh week. Handoff parameters, when given, override the
    /// profile's targets until the next profile submission.
    pub fn new_plan(&mut self, params: Option<PlannerParams>) {
        if let Some(params) = params {
            self.store.save(&self.keys.params, &params);
            self.params = Some(params);
        }
        self.ledger.reset();
        self.persist_ledger();
        log::info!("Started a new weekly plan");
    }

    /// Query string for the exercise page.
    pub fn exercise_handoff(&self) -> Result<String, PlannerError> {
        let params = match (&self.params, &self.profile) {
            (Some(params), _) => *params,
            (None, Some(profile)) => PlannerParams::from_profile(profile),
            (None, None) => return Err(PlannerError::MissingProfile),
        };
        Ok(params.with_daily_goal().to_query())
    }

    pub fn add_food(&mut self, day: usize, form: &FoodForm) -> Result<Uuid, PlannerError> {
        let name = require_name(&form.name)?;
        let id = self
            .ledger
            .add_entry(day, name, form.calories, true, form.meal_type)?;
        self.persist_ledger();
        Ok(id)
    }

    /// Totals the meal builder's ingredients and logs the meal as one entry.
    pub fn add_meal(&mut self, day: usize, form: &MealForm) -> Result<Uuid, PlannerError> {
        let name = require_name(&form.name)?;
        let calories = meal_calories(form)?;
        let id = self
            .ledger
            .add_entry(day, name, calories, true, form.meal_type)?;
        self.persist_ledger();
        Ok(id)
    }

    /// Estimates burn from MET, intensity, duration and the current BMR.
    pub fn add_exercise(
        &mut self,
        day: usize,
        form: &ExerciseForm,
    ) -> Result<(Uuid, f64), PlannerError> {
        let targets = self.targets()?;
        let (label, met) = match (&form.activity, form.met) {
            (Some(name), _) if !name.trim().is_empty() => {
                let activity =
                    find_activity(name).ok_or_else(|| PlannerError::UnknownActivity(name.clone()))?;
                (activity.name.to_string(), activity.met)
            }
            (_, Some(met)) => (format!("MET {}", met), met),
            _ => return Err(ValidationError::Missing("activity").into()),
        };
        check_positive("met", met)?;
        check_positive("minutes", form.minutes)?;

        let burned = calculate_exercise_burn(met, form.intensity, targets.bmr as f64, form.minutes);
        let label = format!("{} - {} min", label, form.minutes);
        let id = self
            .ledger
            .add_entry(day, label, burned, false, MealType::Exercise)?;
        self.persist_ledger();
        Ok((id, burned))
    }

    pub fn remove_entry(&mut self, day: usize, id: Uuid) -> Result<LineItem, PlannerError> {
        let item = self.ledger.remove_entry(day, id)?;
        self.persist_ledger();
        Ok(item)
    }

    /// Removal by position within a meal-type group, as rendered.
    pub fn remove_by_type_index(
        &mut self,
        day: usize,
        meal_type: MealType,
        index: usize,
    ) -> Result<LineItem, PlannerError> {
        let item = self.ledger.remove_by_type_index(day, meal_type, index)?;
        self.persist_ledger();
        Ok(item)
    }

    pub fn week_view(&self) -> Result<WeekView, PlannerError> {
        let daily_goal = self.targets()?.daily_goal;
        let goal = daily_goal as f64;
        let days = self
            .ledger
            .days()
            .iter()
            .enumerate()
            .map(|(index, day)| -> Result<DayView, PlannerError> {
                let remaining = self.ledger.daily_remaining(index, goal)?;
                Ok(DayView {
                    index,
                    label: weekday_label(weekday_from_index(index)?),
                    entries: day.entries.clone(),
                    consumed: day.calories_consumed(),
                    burned: day.calories_burned(),
                    net: day.net(),
                    remaining,
                    status: BudgetStatus::from_remaining(remaining),
                })
            })
            .collect::<Result<Vec<_>, PlannerError>>()?;
        Ok(WeekView { daily_goal, days })
    }

    pub fn summary(&self) -> Result<SummaryView, PlannerError> {
        let targets = self.targets()?;
        Ok(SummaryView {
            targets,
            summary: self.ledger.weekly_summary(targets.daily_goal as f64),
            estimate: self.ledger.estimate_weight_change(targets.tdee as f64),
        })
    }

    pub fn chart(&self) -> Result<ChartData, PlannerError> {
        let targets = self.targets()?;
        Ok(ChartData {
            weekly: WeeklyChart::from_ledger(&self.ledger, targets.daily_goal as f64),
            weight: WeightTrendChart::from_history(&self.history, self.goal_weight()),
        })
    }

    /// Records a weigh-in and makes it the profile's current weight.
    pub fn record_weight(
        &mut self,
        date: NaiveDate,
        weight: f64,
        unit: WeightUnit,
    ) -> Result<(), PlannerError> {
        check_positive("weight", weight)?;
        let weight_kg = unit.to_kg(weight);
        let is_start = self.history.is_empty()
            || self
                .history
                .entries()
                .iter()
                .any(|e| e.date == date && e.is_start_weight);
        self.history.record(date, weight_kg, is_start);
        log::info!("Recorded weight {:.1} kg on {}", weight_kg, date);

        if let Some(profile) = self.profile.as_mut() {
            profile.weight_kg = weight_kg;
        }
        if let Some(user) = self.user.clone() {
            self.history.save(&mut self.store, &weight_history_key(&user));
            if let Some(profile) = &self.profile {
                self.store.save(&profile_key(&user), profile);
            }
        }
        Ok(())
    }

    pub fn progress(&self, today: NaiveDate) -> Result<ProgressView, PlannerError> {
        let goal_weight = self.goal_weight().ok_or(PlannerError::MissingProfile)?;
        Ok(ProgressView {
            goal_weight,
            start_weight: self
                .profile
                .as_ref()
                .map(|p| p.start_weight_kg)
                .or_else(|| self.history.oldest().map(|e| e.weight)),
            latest_weight: self.history.latest().map(|e| e.weight),
            projection: project_completion(&self.history, goal_weight, today),
        })
    }

    fn goal_weight(&self) -> Option<f64> {
        self.profile
            .as_ref()
            .map(|p| p.goal_weight_kg)
            .or_else(|| self.params.map(|p| p.goal))
    }

    fn persist_ledger(&mut self) {
        if !self.ledger.save(&mut self.store, &self.keys) {
            log::warn!("Planner changes kept in memory only");
        }
    }
}

fn require_name(name: &str) -> Result<&str, ValidationError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ValidationError::Missing("name"));
    }
    Ok(name)
}

fn check_positive(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NotANumber {
            field,
            value: value.to_string(),
        });
    }
    if value <= 0.0 {
        return Err(ValidationError::NotPositive { field, value });
    }
    Ok(())
}

/// Sums the adjusted calories of every ingredient line.
pub fn meal_calories(form: &MealForm) -> Result<f64, PlannerError> {
    if form.ingredients.is_empty() {
        return Err(PlannerError::EmptyMeal);
    }
    let mut total = 0.0;
    for line in &form.ingredients {
        check_positive("quantity", line.quantity)?;
        let (base_calories, base_unit) = match (line.base_calories, line.base_unit) {
            (Some(calories), Some(unit)) => (calories, unit),
            _ => {
                let ingredient = find_ingredient(&line.ingredient)
                    .ok_or_else(|| PlannerError::UnknownIngredient(line.ingredient.clone()))?;
                (ingredient.base_calories, ingredient.base_unit)
            }
        };
        total += calculate_portion_calories(base_calories, base_unit, line.quantity, line.unit);
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    const EMAIL: &str = "sam@example.com";

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 3).unwrap()
    }

    fn profile_form() -> ProfileForm {
        ProfileForm {
            age: Some("30".into()),
            sex: Some("male".into()),
            weight: Some("80".into()),
            height: Some("175".into()),
            activity: Some("moderate".into()),
            goal_weight: Some("75".into()),
            duration: Some("10".into()),
            ..Default::default()
        }
    }

    fn session_with_profile() -> PlannerSession<MemoryStore> {
        let mut session = PlannerSession::open(MemoryStore::new(), Some(EMAIL.to_string()));
        session.submit_profile(&profile_form(), today()).unwrap();
        session
    }

    fn food(name: &str, calories: f64, meal_type: MealType) -> FoodForm {
        FoodForm {
            name: name.into(),
            calories,
            meal_type,
        }
    }

    #[test]
    fn test_submit_profile_persists_and_hands_off() {
        let mut session = PlannerSession::open(MemoryStore::new(), Some(EMAIL.to_string()));
        let outcome = session.submit_profile(&profile_form(), today()).unwrap();

        // 10×80 + 6.25×175 - 150 + 5 = 1748.75
        assert_eq!(outcome.metrics.bmr, 1749);
        // 1748.75 × 1.55 = 2710.5625
        assert_eq!(outcome.metrics.tdee, 2711);
        assert_eq!(outcome.metrics.daily_deficit, 550);
        assert_eq!(outcome.metrics.daily_goal, 2161);
        assert_eq!(
            outcome.planner_query,
            "bmr=1749&tdee=2711&weight=80&goal=75&time=10"
        );

        let stored: UserProfile = session.store().load(&profile_key(EMAIL)).unwrap();
        assert_eq!(stored, outcome.profile);
        assert_eq!(session.history().len(), 1);
        assert!(session.history().latest().unwrap().is_start_weight);
    }

    #[test]
    fn test_submit_profile_rejects_invalid_form() {
        let mut session = PlannerSession::open(MemoryStore::new(), Some(EMAIL.to_string()));
        let mut form = profile_form();
        form.age = Some("thirty".into());
        assert!(matches!(
            session.submit_profile(&form, today()),
            Err(PlannerError::Validation(ValidationError::NotANumber { field: "age", .. }))
        ));
        assert!(session.profile().is_none());
        assert!(matches!(session.targets(), Err(PlannerError::MissingProfile)));
    }

    #[test]
    fn test_mutations_persist_and_restore() {
        let mut session = session_with_profile();
        session.add_food(0, &food("Oats", 300.0, MealType::Breakfast)).unwrap();
        session.add_food(0, &food("Salad", 450.0, MealType::Lunch)).unwrap();

        let store = session.store().clone();
        let restored = PlannerSession::open(store, Some(EMAIL.to_string()));
        assert_eq!(restored.ledger(), session.ledger());
        assert_eq!(restored.profile(), session.profile());
        assert_eq!(restored.targets().unwrap().daily_goal, 2161);
    }

    #[test]
    fn test_unkeyed_session_uses_fallback_keys() {
        let mut session = PlannerSession::open(MemoryStore::new(), None);
        let params = PlannerParams::from_query("bmr=1649&tdee=2556&weight=80&goal=75&time=10")
            .unwrap();
        session.new_plan(Some(params));
        session.add_food(3, &food("Toast", 200.0, MealType::Breakfast)).unwrap();

        let calories: Vec<f64> = session.store().load_or("weeklyCalories", Vec::new());
        assert_eq!(calories[3], 200.0);
        assert_eq!(session.targets().unwrap().daily_goal, 2006);
        assert_eq!(
            session.exercise_handoff().unwrap(),
            "bmr=1649&tdee=2556&weight=80&goal=75&time=10&dailyGoal=2006"
        );
    }

    #[test]
    fn test_handoff_targets_survive_reopen() {
        let mut session = PlannerSession::open(MemoryStore::new(), None);
        let params = PlannerParams::from_query("bmr=1649&tdee=2556&weight=80&goal=75&time=10")
            .unwrap();
        session.new_plan(Some(params));
        session.add_food(1, &food("Soup", 350.0, MealType::Dinner)).unwrap();

        let mut restored = PlannerSession::open(session.store().clone(), None);
        assert_eq!(restored.ledger(), session.ledger());
        assert_eq!(
            restored.targets().unwrap(),
            PlanTargets { bmr: 1649, tdee: 2556, daily_goal: 2006 }
        );
        let week = restored.week_view().unwrap();
        assert_eq!(week.days[1].remaining, 2006.0 - 350.0);

        // Starting over without parameters keeps the stored targets
        restored.new_plan(None);
        restored.reload_state();
        assert_eq!(restored.targets().unwrap().daily_goal, 2006);
    }

    #[test]
    fn test_profile_submission_clears_handoff_targets() {
        let mut session = PlannerSession::open(MemoryStore::new(), Some(EMAIL.to_string()));
        let params = PlannerParams::from_query("bmr=1500&tdee=2000&weight=80&goal=75&time=10")
            .unwrap();
        session.new_plan(Some(params));
        assert_eq!(session.targets().unwrap().tdee, 2000);

        session.submit_profile(&profile_form(), today()).unwrap();
        assert_eq!(session.targets().unwrap().daily_goal, 2161);
        assert_eq!(session.store().load::<PlannerParams>("planner_sam@example.com_params"), None);

        let restored = PlannerSession::open(session.store().clone(), Some(EMAIL.to_string()));
        assert_eq!(restored.targets().unwrap().daily_goal, 2161);
    }

    #[test]
    fn test_add_food_requires_name() {
        let mut session = session_with_profile();
        assert!(matches!(
            session.add_food(0, &food("   ", 100.0, MealType::Snack)),
            Err(PlannerError::Validation(ValidationError::Missing("name")))
        ));
        assert!(matches!(
            session.add_food(8, &food("Chips", 100.0, MealType::Snack)),
            Err(PlannerError::Ledger(_))
        ));
    }

    #[test]
    fn test_add_meal_sums_ingredients() {
        let mut session = session_with_profile();
        let meal = MealForm {
            name: "Rice bowl".into(),
            meal_type: MealType::Dinner,
            ingredients: vec![
                IngredientLine {
                    ingredient: "White rice".into(),
                    base_calories: None,
                    base_unit: None,
                    quantity: 1.0,
                    unit: PortionUnit::Cup,
                },
                IngredientLine {
                    ingredient: "Egg".into(),
                    base_calories: None,
                    base_unit: None,
                    quantity: 2.0,
                    unit: PortionUnit::Unit,
                },
                IngredientLine {
                    ingredient: "House sauce".into(),
                    base_calories: Some(50.0),
                    base_unit: Some(BaseUnit::Tbsp),
                    quantity: 1.0,
                    unit: PortionUnit::Tbsp,
                },
            ],
        };
        // 206 × 2.4 + 78 × 2 + 50 × 0.15 = 494.4 + 156 + 7.5
        let expected = 657.9;
        assert!((meal_calories(&meal).unwrap() - expected).abs() < 1e-9);

        let id = session.add_meal(2, &meal).unwrap();
        let entry = &session.ledger().day(2).unwrap().entries[0];
        assert_eq!(entry.id, id);
        assert_eq!(entry.name, "Rice bowl");
        assert!((entry.cal - expected).abs() < 1e-9);
    }

    #[test]
    fn test_add_meal_errors() {
        let empty = MealForm {
            name: "Nothing".into(),
            meal_type: MealType::Snack,
            ingredients: Vec::new(),
        };
        assert!(matches!(meal_calories(&empty), Err(PlannerError::EmptyMeal)));

        let unknown = MealForm {
            name: "Mystery".into(),
            meal_type: MealType::Snack,
            ingredients: vec![IngredientLine {
                ingredient: "Dragonfruit jam".into(),
                base_calories: None,
                base_unit: None,
                quantity: 1.0,
                unit: PortionUnit::Tbsp,
            }],
        };
        assert!(matches!(
            meal_calories(&unknown),
            Err(PlannerError::UnknownIngredient(_))
        ));
    }

    #[test]
    fn test_add_exercise_uses_bmr() {
        let mut session = PlannerSession::open(MemoryStore::new(), None);
        session.new_plan(Some(
            PlannerParams::from_query("bmr=1649&tdee=2556&weight=80&goal=75&time=10").unwrap(),
        ));

        let form = ExerciseForm {
            activity: Some("Running (5 mph)".into()),
            met: None,
            intensity: Intensity::Medium,
            minutes: 30.0,
        };
        let (id, burned) = session.add_exercise(1, &form).unwrap();
        assert_eq!(burned, 275.0);

        let day = session.ledger().day(1).unwrap();
        assert_eq!(day.calories_burned(), 275.0);
        assert_eq!(day.entries[0].id, id);
        assert_eq!(day.entries[0].meal_type, MealType::Exercise);
        assert_eq!(day.entries[0].name, "Running (5 mph) - 30 min");
    }

    #[test]
    fn test_add_exercise_errors() {
        let mut session = session_with_profile();
        let unknown = ExerciseForm {
            activity: Some("Juggling".into()),
            met: None,
            intensity: Intensity::Low,
            minutes: 10.0,
        };
        assert!(matches!(
            session.add_exercise(0, &unknown),
            Err(PlannerError::UnknownActivity(_))
        ));

        let no_time = ExerciseForm {
            activity: None,
            met: Some(4.0),
            intensity: Intensity::Low,
            minutes: 0.0,
        };
        assert!(matches!(
            session.add_exercise(0, &no_time),
            Err(PlannerError::Validation(ValidationError::NotPositive { field: "minutes", .. }))
        ));

        let mut fresh = PlannerSession::open(MemoryStore::new(), None);
        assert!(matches!(
            fresh.add_exercise(0, &no_time),
            Err(PlannerError::MissingProfile)
        ));
    }

    #[test]
    fn test_remove_by_type_index_through_session() {
        let mut session = session_with_profile();
        session.add_food(0, &food("Eggs", 300.0, MealType::Breakfast)).unwrap();
        session
            .add_exercise(
                0,
                &ExerciseForm {
                    activity: Some("Yoga".into()),
                    met: None,
                    intensity: Intensity::Medium,
                    minutes: 60.0,
                },
            )
            .unwrap();
        session.add_food(0, &food("Fruit", 150.0, MealType::Breakfast)).unwrap();

        let removed = session.remove_by_type_index(0, MealType::Breakfast, 1).unwrap();
        assert_eq!(removed.name, "Fruit");

        let view = session.week_view().unwrap();
        assert_eq!(view.days[0].consumed, 300.0);
        assert_eq!(view.days[0].entries.len(), 2);

        let store = session.store().clone();
        let restored = PlannerSession::open(store, Some(EMAIL.to_string()));
        assert_eq!(restored.ledger().day(0).unwrap().calories_consumed(), 300.0);
    }

    #[test]
    fn test_week_view_flags_budget() {
        let mut session = session_with_profile();
        session.add_food(0, &food("Meals", 2161.0, MealType::Dinner)).unwrap();
        session.add_food(1, &food("Meals", 2162.0, MealType::Dinner)).unwrap();

        let view = session.week_view().unwrap();
        assert_eq!(view.daily_goal, 2161);
        assert_eq!(view.days[0].label, "Mon");
        assert_eq!(view.days[0].remaining, 0.0);
        assert_eq!(view.days[0].status, BudgetStatus::OnTrack);
        assert_eq!(view.days[1].remaining, -1.0);
        assert_eq!(view.days[1].status, BudgetStatus::OverBudget);
        assert_eq!(view.days[2].status, BudgetStatus::OnTrack);
    }

    #[test]
    fn test_summary_reports_both_computations() {
        let mut session = session_with_profile();
        for day in 0..7 {
            session.add_food(day, &food("Meals", 2000.0, MealType::Lunch)).unwrap();
        }
        let view = session.summary().unwrap();
        // 2161 × 7 - 14000
        assert_eq!(view.summary.weekly_outcome, 1127.0);
        // 2711 × 7 - 14000
        assert_eq!(view.estimate.weekly_deficit, 4977.0);
        assert!((view.estimate.weight_change_kg - 4977.0 / 7700.0).abs() < 1e-12);
    }

    #[test]
    fn test_new_plan_resets_week() {
        let mut session = session_with_profile();
        session.add_food(5, &food("Cake", 500.0, MealType::Snack)).unwrap();
        session.new_plan(None);
        assert_eq!(session.ledger(), &WeeklyLedger::new());
        assert_eq!(session.targets().unwrap().daily_goal, 2161);

        let restored = PlannerSession::open(session.store().clone(), Some(EMAIL.to_string()));
        assert_eq!(restored.ledger(), &WeeklyLedger::new());
    }

    #[test]
    fn test_record_weight_and_progress() {
        let mut session = session_with_profile();
        let d = |day| NaiveDate::from_ymd_opt(2024, 6, day).unwrap();
        session.record_weight(d(10), 79.0, WeightUnit::Kg).unwrap();
        session.record_weight(d(17), 78.0, WeightUnit::Kg).unwrap();

        assert_eq!(session.profile().unwrap().weight_kg, 78.0);
        assert_eq!(session.profile().unwrap().start_weight_kg, 80.0);

        let progress = session.progress(d(17)).unwrap();
        assert_eq!(progress.goal_weight, 75.0);
        assert_eq!(progress.start_weight, Some(80.0));
        assert_eq!(progress.latest_weight, Some(78.0));
        let json = serde_json::to_value(&progress).unwrap();
        assert_eq!(json["projection"]["status"], "on_track");
        assert_eq!(json["goalWeight"], 75.0);
        // 2 kg over 14 days = 1 kg/week, 3 kg to go
        match progress.projection {
            Ok(Projection::OnTrack { projected_date, .. }) => {
                assert_eq!(projected_date, d(17) + chrono::Duration::days(21))
            }
            other => panic!("unexpected projection: {:?}", other),
        }

        let restored = PlannerSession::open(session.store().clone(), Some(EMAIL.to_string()));
        assert_eq!(restored.history().len(), 3);
        assert_eq!(restored.profile().unwrap().weight_kg, 78.0);
    }

    #[test]
    fn test_record_weight_with_negligible_loss() {
        let mut session = session_with_profile();
        let d = |day| NaiveDate::from_ymd_opt(2024, 6, day).unwrap();
        session.record_weight(d(10), 79.99999999, WeightUnit::Kg).unwrap();

        let progress = session.progress(d(10)).unwrap();
        assert!(matches!(
            progress.projection,
            Ok(Projection::Unprojectable { time_span_days: 7, .. })
        ));
        let json = serde_json::to_value(&progress).unwrap();
        assert_eq!(json["projection"]["status"], "unprojectable");
    }

    #[test]
    fn test_record_weight_rejects_bad_values() {
        let mut session = session_with_profile();
        assert!(session.record_weight(today(), 0.0, WeightUnit::Kg).is_err());
        assert!(session.record_weight(today(), f64::NAN, WeightUnit::Kg).is_err());

        session.record_weight(today(), 165.0, WeightUnit::Lb).unwrap();
        let latest = session.history().latest().unwrap();
        assert!((latest.weight - 165.0 / 2.20462).abs() < 1e-9);
        assert!(latest.is_start_weight);
    }

    #[test]
    fn test_chart_payload() {
        let mut session = session_with_profile();
        session.add_food(0, &food("Lunch", 1000.0, MealType::Lunch)).unwrap();
        let chart = session.chart().unwrap();
        assert_eq!(chart.weekly.intake[0], 1000.0);
        assert_eq!(chart.weekly.goal[0], 2161.0);
        assert_eq!(chart.weight.goal, Some(75.0));
        assert_eq!(chart.weight.weights, vec![80.0]);
    }
}
