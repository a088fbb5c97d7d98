//! Weekly nutrition ledger.
//!
//! Seven [`DayLedger`]s, Monday first. Day totals are computed from the
//! itemized entries, and removal works by stable entry id so that entries
//! with identical fields are never confused.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{DAYS_PER_WEEK, DayLedger, LineItem, MealType, weekday_from_index};
use crate::error::LedgerError;
use crate::formulas::KCAL_PER_KG;
use crate::store::{JsonStoreExt, KeyValueStore, PlannerKeys};

/// Whether a day is within its calorie budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetStatus {
    OnTrack,
    OverBudget,
}

impl BudgetStatus {
    /// `remaining >= 0` is on track, anything below zero is over budget.
    pub fn from_remaining(remaining: f64) -> Self {
        if remaining >= 0.0 {
            BudgetStatus::OnTrack
        } else {
            BudgetStatus::OverBudget
        }
    }
}

/// Weekly totals against the adjusted daily goal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklySummary {
    pub total_intake: f64,
    pub total_exercise_burn: f64,
    /// `goal × 7 - (intake - burn)`; non-negative means a net deficit.
    pub weekly_outcome: f64,
}

impl WeeklySummary {
    pub fn is_deficit(&self) -> bool {
        self.weekly_outcome >= 0.0
    }
}

/// Expected weight change for the week, measured against maintenance (TDEE).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeightChangeEstimate {
    pub weekly_deficit: f64,
    /// Positive values are kilograms lost.
    pub weight_change_kg: f64,
}

/// The planner week.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeeklyLedger {
    days: [DayLedger; DAYS_PER_WEEK],
}

impl WeeklyLedger {
    /// A fresh, all-zero week.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn days(&self) -> &[DayLedger; DAYS_PER_WEEK] {
        &self.days
    }

    pub fn day(&self, day: usize) -> Result<&DayLedger, LedgerError> {
        weekday_from_index(day)?;
        Ok(&self.days[day])
    }

    fn day_mut(&mut self, day: usize) -> Result<&mut DayLedger, LedgerError> {
        weekday_from_index(day)?;
        Ok(&mut self.days[day])
    }

    /// Logs an entry. `calories` is a magnitude; `is_consumption` picks the sign.
    ///
    /// Returns the id of the new entry.
    pub fn add_entry(
        &mut self,
        day: usize,
        label: impl Into<String>,
        calories: f64,
        is_consumption: bool,
        meal_type: MealType,
    ) -> Result<Uuid, LedgerError> {
        if !calories.is_finite() || calories < 0.0 {
            return Err(LedgerError::InvalidCalories(calories));
        }
        let item = if is_consumption {
            LineItem::consumed(label, calories, meal_type)
        } else {
            LineItem::burned(label, calories, meal_type)
        };
        let id = item.id;
        log::debug!(
            "day {}: add {} {} ({} kcal)",
            day,
            item.meal_type,
            item.name,
            item.cal
        );
        self.day_mut(day)?.entries.push(item);
        Ok(id)
    }

    /// Removes the entry with `id` from `day`.
    pub fn remove_entry(&mut self, day: usize, id: Uuid) -> Result<LineItem, LedgerError> {
        let entries = &mut self.day_mut(day)?.entries;
        let position = entries
            .iter()
            .position(|e| e.id == id)
            .ok_or(LedgerError::EntryNotFound(id))?;
        let item = entries.remove(position);
        log::debug!("day {}: removed {} ({} kcal)", day, item.name, item.cal);
        Ok(item)
    }

    /// Removes the `index`-th entry among those tagged `meal_type`.
    ///
    /// The filtered position is resolved to the entry's id before removal.
    pub fn remove_by_type_index(
        &mut self,
        day: usize,
        meal_type: MealType,
        index: usize,
    ) -> Result<LineItem, LedgerError> {
        let id = self
            .day(day)?
            .entries_of(meal_type)
            .nth(index)
            .map(|e| e.id)
            .ok_or_else(|| LedgerError::EntryIndexOutOfRange {
                meal_type: meal_type.to_string(),
                index,
            })?;
        self.remove_entry(day, id)
    }

    /// `goal - (consumed - burned)` for one day.
    pub fn daily_remaining(&self, day: usize, daily_goal: f64) -> Result<f64, LedgerError> {
        Ok(daily_goal - self.day(day)?.net())
    }

    pub fn total_intake(&self) -> f64 {
        self.days
            .iter()
            .fold(0.0, |acc, d| acc + d.calories_consumed())
    }

    pub fn total_exercise_burn(&self) -> f64 {
        self.days
            .iter()
            .fold(0.0, |acc, d| acc + d.calories_burned())
    }

    /// Weekly totals and outcome against the adjusted daily goal.
    pub fn weekly_summary(&self, daily_goal: f64) -> WeeklySummary {
        let total_intake = self.total_intake();
        let total_exercise_burn = self.total_exercise_burn();
        WeeklySummary {
            total_intake,
            total_exercise_burn,
            weekly_outcome: daily_goal * 7.0 - (total_intake - total_exercise_burn),
        }
    }

    /// Weight change implied by the week relative to maintenance.
    ///
    /// Uses TDEE rather than the daily goal, so it differs from
    /// [`WeeklySummary::weekly_outcome`] by the planned deficit.
    pub fn estimate_weight_change(&self, tdee: f64) -> WeightChangeEstimate {
        let weekly_deficit = self.total_exercise_burn() + (tdee * 7.0 - self.total_intake());
        WeightChangeEstimate {
            weekly_deficit,
            weight_change_kg: weekly_deficit / KCAL_PER_KG,
        }
    }

    /// Starts a new plan: every day back to zero.
    pub fn reset(&mut self) {
        self.days = Default::default();
    }

    /// Parallel-array form used on disk.
    pub fn to_persisted(&self) -> PersistedWeek {
        PersistedWeek {
            calories: self.days.iter().map(DayLedger::calories_consumed).collect(),
            exercise: self.days.iter().map(DayLedger::calories_burned).collect(),
            foods: self.days.iter().map(|d| d.entries.clone()).collect(),
        }
    }

    /// Rebuilds a week from the parallel arrays.
    ///
    /// Entries are authoritative. Returns `None` when the arrays do not hold
    /// seven days.
    pub fn from_persisted(week: PersistedWeek) -> Option<Self> {
        if week.foods.len() != DAYS_PER_WEEK {
            return None;
        }
        let mut ledger = Self::new();
        for (day, entries) in week.foods.into_iter().enumerate() {
            ledger.days[day].entries = entries;
        }

        let consistent = week.calories.len() == DAYS_PER_WEEK
            && week.exercise.len() == DAYS_PER_WEEK
            && ledger.days.iter().enumerate().all(|(i, d)| {
                (d.calories_consumed() - week.calories[i]).abs() < 1e-6
                    && (d.calories_burned() - week.exercise[i]).abs() < 1e-6
            });
        if !consistent {
            log::warn!("Stored weekly totals disagree with entries, recomputing from entries");
        }
        Some(ledger)
    }

    /// Loads the week stored under `keys`, or a fresh week.
    pub fn load<S: KeyValueStore + ?Sized>(store: &S, keys: &PlannerKeys) -> Self {
        let week = PersistedWeek {
            calories: store.load_or(&keys.calories, Vec::new()),
            exercise: store.load_or(&keys.exercise, Vec::new()),
            foods: store.load_or(&keys.foods, Vec::new()),
        };
        if week.foods.is_empty() {
            return Self::new();
        }
        Self::from_persisted(week).unwrap_or_else(|| {
            log::warn!("Stored week under {} is not seven days, starting fresh", keys.foods);
            Self::new()
        })
    }

    /// Writes all three arrays. Returns false if any write failed.
    pub fn save<S: KeyValueStore + ?Sized>(&self, store: &mut S, keys: &PlannerKeys) -> bool {
        let week = self.to_persisted();
        let calories = store.save(&keys.calories, &week.calories);
        let exercise = store.save(&keys.exercise, &week.exercise);
        let foods = store.save(&keys.foods, &week.foods);
        calories && exercise && foods
    }
}

/// On-disk shape: three parallel seven-element arrays.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistedWeek {
    pub calories: Vec<f64>,
    pub exercise: Vec<f64>,
    pub foods: Vec<Vec<LineItem>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn assert_sum_invariant(ledger: &WeeklyLedger) {
        for day in ledger.days() {
            let consumed: f64 = day.entries.iter().filter(|e| e.cal > 0.0).map(|e| e.cal).sum();
            let burned: f64 = day.entries.iter().filter(|e| e.cal < 0.0).map(|e| -e.cal).sum();
            assert!((day.calories_consumed() - consumed).abs() < 1e-9);
            assert!((day.calories_burned() - burned).abs() < 1e-9);
        }
    }

    #[test]
    fn test_add_entry_applies_sign() {
        let mut ledger = WeeklyLedger::new();
        ledger.add_entry(0, "Oats", 300.0, true, MealType::Breakfast).unwrap();
        ledger.add_entry(0, "Run", 200.0, false, MealType::Exercise).unwrap();

        let day = ledger.day(0).unwrap();
        assert_eq!(day.entries[0].cal, 300.0);
        assert_eq!(day.entries[1].cal, -200.0);
        assert_eq!(day.calories_consumed(), 300.0);
        assert_eq!(day.calories_burned(), 200.0);
    }

    #[test]
    fn test_add_entry_rejects_bad_input() {
        let mut ledger = WeeklyLedger::new();
        assert_eq!(
            ledger.add_entry(7, "x", 10.0, true, MealType::Snack),
            Err(LedgerError::DayOutOfRange(7))
        );
        assert!(matches!(
            ledger.add_entry(0, "x", -10.0, true, MealType::Snack),
            Err(LedgerError::InvalidCalories(_))
        ));
        assert!(matches!(
            ledger.add_entry(0, "x", f64::NAN, true, MealType::Snack),
            Err(LedgerError::InvalidCalories(_))
        ));
        assert!(ledger.day(0).unwrap().entries.is_empty());
    }

    #[test]
    fn test_remove_by_type_index_picks_filtered_item() {
        let mut ledger = WeeklyLedger::new();
        ledger.add_entry(2, "Eggs", 300.0, true, MealType::Breakfast).unwrap();
        let run = ledger.add_entry(2, "Run", 200.0, false, MealType::Exercise).unwrap();
        ledger.add_entry(2, "Fruit", 150.0, true, MealType::Breakfast).unwrap();

        let removed = ledger.remove_by_type_index(2, MealType::Breakfast, 1).unwrap();
        assert_eq!(removed.name, "Fruit");

        let day = ledger.day(2).unwrap();
        assert_eq!(day.calories_consumed(), 300.0);
        assert_eq!(day.calories_burned(), 200.0);
        assert!(day.entries.iter().any(|e| e.id == run && e.cal == -200.0));
        assert_sum_invariant(&ledger);
    }

    #[test]
    fn test_remove_duplicate_looking_entries_by_id() {
        let mut ledger = WeeklyLedger::new();
        let first = ledger.add_entry(1, "Apple", 95.0, true, MealType::Snack).unwrap();
        let second = ledger.add_entry(1, "Apple", 95.0, true, MealType::Snack).unwrap();

        ledger.remove_entry(1, second).unwrap();
        let day = ledger.day(1).unwrap();
        assert_eq!(day.entries.len(), 1);
        assert_eq!(day.entries[0].id, first);

        assert_eq!(
            ledger.remove_entry(1, second),
            Err(LedgerError::EntryNotFound(second))
        );
    }

    #[test]
    fn test_remove_exercise_restores_burn() {
        let mut ledger = WeeklyLedger::new();
        ledger.add_entry(4, "Dinner", 700.0, true, MealType::Dinner).unwrap();
        let swim = ledger.add_entry(4, "Swim", 250.0, false, MealType::Exercise).unwrap();
        assert_eq!(ledger.day(4).unwrap().net(), 450.0);

        ledger.remove_entry(4, swim).unwrap();
        assert_eq!(ledger.day(4).unwrap().calories_burned(), 0.0);
        assert_eq!(ledger.day(4).unwrap().net(), 700.0);
    }

    #[test]
    fn test_remove_by_type_index_out_of_range() {
        let mut ledger = WeeklyLedger::new();
        ledger.add_entry(0, "Soup", 200.0, true, MealType::Lunch).unwrap();
        assert!(matches!(
            ledger.remove_by_type_index(0, MealType::Lunch, 1),
            Err(LedgerError::EntryIndexOutOfRange { index: 1, .. })
        ));
        assert!(matches!(
            ledger.remove_by_type_index(0, MealType::Dinner, 0),
            Err(LedgerError::EntryIndexOutOfRange { .. })
        ));
    }

    #[test]
    fn test_sum_invariant_across_mixed_operations() {
        let mut ledger = WeeklyLedger::new();
        let mut ids = Vec::new();
        for i in 0..20 {
            let day = i % 7;
            let consume = i % 3 != 0;
            let meal = if consume { MealType::Lunch } else { MealType::Exercise };
            let id = ledger
                .add_entry(day, format!("item {i}"), 10.0 * i as f64 + 0.5, consume, meal)
                .unwrap();
            ids.push((day, id));
            if i % 4 == 3 {
                let (d, id) = ids.remove(0);
                ledger.remove_entry(d, id).unwrap();
            }
            assert_sum_invariant(&ledger);
        }
    }

    #[test]
    fn test_daily_remaining_and_budget_boundary() {
        let mut ledger = WeeklyLedger::new();
        ledger.add_entry(0, "Meals", 2000.0, true, MealType::Dinner).unwrap();
        ledger.add_entry(1, "Meals", 2001.0, true, MealType::Dinner).unwrap();

        let exact = ledger.daily_remaining(0, 2000.0).unwrap();
        assert_eq!(exact, 0.0);
        assert_eq!(BudgetStatus::from_remaining(exact), BudgetStatus::OnTrack);

        let over = ledger.daily_remaining(1, 2000.0).unwrap();
        assert_eq!(over, -1.0);
        assert_eq!(BudgetStatus::from_remaining(over), BudgetStatus::OverBudget);

        assert_eq!(
            ledger.daily_remaining(9, 2000.0),
            Err(LedgerError::DayOutOfRange(9))
        );
    }

    #[test]
    fn test_weekly_summary_sign_and_idempotence() {
        let mut ledger = WeeklyLedger::new();
        for day in 0..7 {
            ledger.add_entry(day, "Food", 1800.0, true, MealType::Lunch).unwrap();
        }
        ledger.add_entry(3, "Bike", 300.0, false, MealType::Exercise).unwrap();

        let first = ledger.weekly_summary(2000.0);
        let second = ledger.weekly_summary(2000.0);
        assert_eq!(first, second);

        assert_eq!(first.total_intake, 12600.0);
        assert_eq!(first.total_exercise_burn, 300.0);
        // 14000 - (12600 - 300)
        assert_eq!(first.weekly_outcome, 1700.0);
        assert!(first.is_deficit());

        let surplus = ledger.weekly_summary(1700.0);
        // 11900 - 12300
        assert_eq!(surplus.weekly_outcome, -400.0);
        assert!(!surplus.is_deficit());
    }

    #[test]
    fn test_weight_change_uses_tdee_not_goal() {
        let mut ledger = WeeklyLedger::new();
        for day in 0..7 {
            ledger.add_entry(day, "Food", 2000.0, true, MealType::Dinner).unwrap();
        }
        ledger.add_entry(0, "Run", 700.0, false, MealType::Exercise).unwrap();

        let estimate = ledger.estimate_weight_change(2500.0);
        // 700 + (17500 - 14000)
        assert_eq!(estimate.weekly_deficit, 4200.0);
        assert!((estimate.weight_change_kg - 4200.0 / 7700.0).abs() < 1e-12);

        // The goal-based outcome is a different number for the same week.
        let summary = ledger.weekly_summary(2000.0);
        assert_eq!(summary.weekly_outcome, 700.0);
        assert_ne!(summary.weekly_outcome, estimate.weekly_deficit);
    }

    #[test]
    fn test_reset_clears_every_day() {
        let mut ledger = WeeklyLedger::new();
        ledger.add_entry(6, "Pizza", 900.0, true, MealType::Dinner).unwrap();
        ledger.reset();
        assert_eq!(ledger, WeeklyLedger::new());
        assert_eq!(ledger.days().len(), 7);
    }

    #[test]
    fn test_persist_round_trip() {
        let mut store = MemoryStore::new();
        let keys = PlannerKeys::for_user(Some("sam@example.com"));

        let mut ledger = WeeklyLedger::new();
        ledger.add_entry(0, "Oats", 310.5, true, MealType::Breakfast).unwrap();
        ledger.add_entry(0, "Walk", 120.0, false, MealType::Exercise).unwrap();
        ledger.add_entry(5, "Curry", 640.0, true, MealType::Dinner).unwrap();

        assert!(ledger.save(&mut store, &keys));
        let reloaded = WeeklyLedger::load(&store, &keys);
        assert_eq!(reloaded, ledger);

        let calories: Vec<f64> = store.load_or(&keys.calories, Vec::new());
        assert_eq!(calories, vec![310.5, 0.0, 0.0, 0.0, 0.0, 640.0, 0.0]);
        let exercise: Vec<f64> = store.load_or(&keys.exercise, Vec::new());
        assert_eq!(exercise[0], 120.0);
    }

    #[test]
    fn test_load_missing_or_malformed_is_fresh() {
        let mut store = MemoryStore::new();
        let keys = PlannerKeys::for_user(None);
        assert_eq!(WeeklyLedger::load(&store, &keys), WeeklyLedger::new());

        store.save(&keys.foods, &vec![Vec::<LineItem>::new(); 3]);
        assert_eq!(WeeklyLedger::load(&store, &keys), WeeklyLedger::new());
    }

    #[test]
    fn test_load_repairs_inconsistent_totals() {
        let mut store = MemoryStore::new();
        let keys = PlannerKeys::for_user(None);
        let mut foods = vec![Vec::new(); 7];
        foods[0].push(LineItem::consumed("Bagel", 250.0, MealType::Breakfast));
        store.save(&keys.foods, &foods);
        store.save(&keys.calories, &vec![999.0; 7]);

        let ledger = WeeklyLedger::load(&store, &keys);
        assert_eq!(ledger.day(0).unwrap().calories_consumed(), 250.0);
        assert_eq!(ledger.total_intake(), 250.0);
    }
}
