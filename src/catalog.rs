//! Built-in ingredient and activity tables for the meal builder and the
//! exercise form.

use serde::Serialize;

use crate::formulas::BaseUnit;

/// An ingredient with calories per reference unit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Ingredient {
    pub name: &'static str,
    pub base_calories: f64,
    pub base_unit: BaseUnit,
}

/// An activity with its MET value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Activity {
    pub name: &'static str,
    pub met: f64,
}

const INGREDIENTS: &[Ingredient] = &[
    Ingredient { name: "Chicken breast", base_calories: 165.0, base_unit: BaseUnit::Per100g },
    Ingredient { name: "Salmon", base_calories: 208.0, base_unit: BaseUnit::Per100g },
    Ingredient { name: "Ground beef", base_calories: 250.0, base_unit: BaseUnit::Per100g },
    Ingredient { name: "Tofu", base_calories: 76.0, base_unit: BaseUnit::Per100g },
    Ingredient { name: "Broccoli", base_calories: 34.0, base_unit: BaseUnit::Per100g },
    Ingredient { name: "Potato", base_calories: 77.0, base_unit: BaseUnit::Per100g },
    Ingredient { name: "Cheddar cheese", base_calories: 113.0, base_unit: BaseUnit::Oz },
    Ingredient { name: "White rice", base_calories: 206.0, base_unit: BaseUnit::Cup },
    Ingredient { name: "Brown rice", base_calories: 216.0, base_unit: BaseUnit::Cup },
    Ingredient { name: "Pasta", base_calories: 221.0, base_unit: BaseUnit::Cup },
    Ingredient { name: "Oats", base_calories: 307.0, base_unit: BaseUnit::Cup },
    Ingredient { name: "Milk", base_calories: 103.0, base_unit: BaseUnit::Cup },
    Ingredient { name: "Olive oil", base_calories: 119.0, base_unit: BaseUnit::Tbsp },
    Ingredient { name: "Butter", base_calories: 102.0, base_unit: BaseUnit::Tbsp },
    Ingredient { name: "Peanut butter", base_calories: 94.0, base_unit: BaseUnit::Tbsp },
    Ingredient { name: "Sugar", base_calories: 16.0, base_unit: BaseUnit::Tsp },
    Ingredient { name: "Honey", base_calories: 21.0, base_unit: BaseUnit::Tsp },
    Ingredient { name: "Egg", base_calories: 78.0, base_unit: BaseUnit::Unit },
    Ingredient { name: "Banana", base_calories: 105.0, base_unit: BaseUnit::Unit },
    Ingredient { name: "Apple", base_calories: 95.0, base_unit: BaseUnit::Unit },
    Ingredient { name: "Bread slice", base_calories: 79.0, base_unit: BaseUnit::Unit },
];

const ACTIVITIES: &[Activity] = &[
    Activity { name: "Walking (3 mph)", met: 3.5 },
    Activity { name: "Walking (4 mph)", met: 5.0 },
    Activity { name: "Running (5 mph)", met: 8.0 },
    Activity { name: "Running (6 mph)", met: 9.8 },
    Activity { name: "Cycling (moderate)", met: 7.5 },
    Activity { name: "Swimming (laps)", met: 6.0 },
    Activity { name: "Weight training", met: 5.0 },
    Activity { name: "Yoga", met: 2.5 },
    Activity { name: "HIIT", met: 8.0 },
    Activity { name: "Rowing (moderate)", met: 7.0 },
    Activity { name: "Jump rope", met: 11.0 },
    Activity { name: "Dancing", met: 4.5 },
];

pub fn ingredients() -> &'static [Ingredient] {
    INGREDIENTS
}

pub fn activities() -> &'static [Activity] {
    ACTIVITIES
}

/// Case-insensitive ingredient lookup.
pub fn find_ingredient(name: &str) -> Option<&'static Ingredient> {
    let name = name.trim();
    INGREDIENTS.iter().find(|i| i.name.eq_ignore_ascii_case(name))
}

/// Case-insensitive activity lookup.
pub fn find_activity(name: &str) -> Option<&'static Activity> {
    let name = name.trim();
    ACTIVITIES.iter().find(|a| a.name.eq_ignore_ascii_case(name))
}
