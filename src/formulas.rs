//! Energy balance formulas: BMR, TDEE, deficit targets, exercise burn,
//! ingredient portion scaling and unit normalization.

/// Energy content of one kilogram of body-mass change (kcal).
pub const KCAL_PER_KG: f64 = 7700.0;

/// Kilojoules per kilocalorie.
pub const KJ_PER_KCAL: f64 = 4.184;

/// Pounds per kilogram.
pub const LB_PER_KG: f64 = 2.20462;

/// Centimetres per foot and per inch.
pub const CM_PER_FOOT: f64 = 30.48;
pub const CM_PER_INCH: f64 = 2.54;

/// Average weeks per month used when the duration is entered in months.
pub const WEEKS_PER_MONTH: f64 = 4.345;

/// Mifflin-St Jeor coefficients.
mod mifflin {
    pub const WEIGHT: f64 = 10.0;
    pub const HEIGHT: f64 = 6.25;
    pub const AGE: f64 = 5.0;
    pub const MALE_OFFSET: f64 = 5.0;
    pub const FEMALE_OFFSET: f64 = -161.0;
}

/// Calculates basal metabolic rate with the Mifflin-St Jeor equation.
///
/// # Arguments
/// * `weight_kg` - Bodyweight in kilograms
/// * `height_cm` - Height in centimetres
/// * `age_years` - Age in years
/// * `male` - Selects the male offset (+5) instead of the female one (-161)
///
/// # Returns
/// BMR in kcal/day, unrounded
pub fn calculate_bmr(weight_kg: f64, height_cm: f64, age_years: u32, male: bool) -> f64 {
    let offset = if male {
        mifflin::MALE_OFFSET
    } else {
        mifflin::FEMALE_OFFSET
    };
    mifflin::WEIGHT * weight_kg + mifflin::HEIGHT * height_cm - mifflin::AGE * age_years as f64
        + offset
}

/// Total daily energy expenditure: BMR scaled by the activity multiplier.
pub fn calculate_tdee(bmr: f64, activity_multiplier: f64) -> f64 {
    bmr * activity_multiplier
}

/// Daily calorie deficit needed to move from `current_kg` to `goal_kg`
/// within `duration_weeks`.
///
/// Formula: `(current - goal) × 7700 / (weeks × 7)`. A goal above the current
/// weight yields a negative deficit (a surplus).
pub fn calculate_daily_deficit(current_kg: f64, goal_kg: f64, duration_weeks: f64) -> f64 {
    (current_kg - goal_kg) * KCAL_PER_KG / (duration_weeks * 7.0)
}

/// Daily calorie goal: TDEE minus the daily deficit.
pub fn calculate_daily_goal(tdee: f64, daily_deficit: f64) -> f64 {
    tdee - daily_deficit
}

/// Rounds a kcal value the way it is displayed.
pub fn round_kcal(kcal: f64) -> i64 {
    kcal.round() as i64
}

/// Converts an already-rounded kcal value to whole kilojoules.
pub fn kcal_to_kj(kcal: i64) -> i64 {
    (kcal as f64 * KJ_PER_KCAL).round() as i64
}

/// Converts pounds to kilograms.
pub fn lb_to_kg(lb: f64) -> f64 {
    lb / LB_PER_KG
}

/// Converts kilograms to pounds.
pub fn kg_to_lb(kg: f64) -> f64 {
    kg * LB_PER_KG
}

/// Converts a feet + inches height to centimetres.
pub fn feet_inches_to_cm(feet: f64, inches: f64) -> f64 {
    feet * CM_PER_FOOT + inches * CM_PER_INCH
}

/// Converts a duration in months to weeks.
pub fn months_to_weeks(months: f64) -> f64 {
    months * WEEKS_PER_MONTH
}

/// Intensity scaling applied to an activity's MET value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intensity {
    Low,
    Medium,
    High,
}

impl Intensity {
    pub fn multiplier(&self) -> f64 {
        match self {
            Intensity::Low => 0.8,
            Intensity::Medium => 1.0,
            Intensity::High => 1.2,
        }
    }
}

impl std::str::FromStr for Intensity {
    type Err = crate::error::ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Intensity::Low),
            "medium" | "moderate" => Ok(Intensity::Medium),
            "high" => Ok(Intensity::High),
            _ => Err(crate::error::ValidationError::UnknownChoice {
                field: "intensity",
                value: s.to_string(),
            }),
        }
    }
}

/// Estimates calories burned by an activity.
///
/// Formula: `round(MET × intensity × (BMR / 24) × (minutes / 60))`, using
/// BMR / 24 as the resting hourly burn.
pub fn calculate_exercise_burn(met: f64, intensity: Intensity, bmr: f64, minutes: f64) -> f64 {
    let hourly_bmr = bmr / 24.0;
    (met * intensity.multiplier() * hourly_bmr * (minutes / 60.0)).round()
}

/// Unit the user enters an ingredient quantity in.
///
/// Multipliers are a fixed approximation table, not physical conversions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortionUnit {
    #[serde(rename = "g")]
    Grams,
    Cup,
    Oz,
    Tbsp,
    Tsp,
    Unit,
}

impl PortionUnit {
    pub fn multiplier(&self) -> f64 {
        match self {
            PortionUnit::Grams => 0.01,
            PortionUnit::Cup => 2.4,
            PortionUnit::Oz => 0.2835,
            PortionUnit::Tbsp => 0.15,
            PortionUnit::Tsp => 0.05,
            PortionUnit::Unit => 1.0,
        }
    }
}

impl std::str::FromStr for PortionUnit {
    type Err = crate::error::ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "g" | "gram" | "grams" => Ok(PortionUnit::Grams),
            "cup" | "cups" => Ok(PortionUnit::Cup),
            "oz" => Ok(PortionUnit::Oz),
            "tbsp" => Ok(PortionUnit::Tbsp),
            "tsp" => Ok(PortionUnit::Tsp),
            "unit" | "units" => Ok(PortionUnit::Unit),
            _ => Err(crate::error::ValidationError::UnknownChoice {
                field: "unit",
                value: s.to_string(),
            }),
        }
    }
}

/// Reference unit an ingredient's base calories are given for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BaseUnit {
    #[serde(rename = "100g")]
    Per100g,
    Cup,
    Oz,
    Tbsp,
    Tsp,
    Unit,
}

impl BaseUnit {
    /// 100 for per-100g ingredients, 1 for everything else.
    pub fn divisor(&self) -> f64 {
        match self {
            BaseUnit::Per100g => 100.0,
            _ => 1.0,
        }
    }
}

/// Scales an ingredient's base calories to the entered portion.
///
/// Formula: `base / divisor × quantity × unit multiplier`.
pub fn calculate_portion_calories(
    base_calories: f64,
    base_unit: BaseUnit,
    quantity: f64,
    unit: PortionUnit,
) -> f64 {
    (base_calories / base_unit.divisor()) * quantity * unit.multiplier()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Helper to check floating point equality with tolerance
    fn approx_eq(a: f64, b: f64, tolerance: f64) -> bool {
        (a - b).abs() < tolerance
    }

    #[test]
    fn test_bmr_male_reference() {
        // 10×70 + 6.25×175 - 5×30 + 5 = 1648.75
        let bmr = calculate_bmr(70.0, 175.0, 30, true);
        assert!(approx_eq(bmr, 1648.75, 1e-9));
        assert_eq!(round_kcal(bmr), 1649);
    }

    #[test]
    fn test_bmr_female_offset() {
        let male = calculate_bmr(60.0, 165.0, 25, true);
        let female = calculate_bmr(60.0, 165.0, 25, false);
        assert!(approx_eq(male - female, 166.0, 1e-9));
    }

    #[test]
    fn test_tdee_and_goal_reference() {
        let tdee = calculate_tdee(1649.0, 1.55);
        assert_eq!(round_kcal(tdee), 2556);

        let deficit = calculate_daily_deficit(80.0, 75.0, 10.0);
        assert!(approx_eq(deficit, 550.0, 1e-9));

        let goal = calculate_daily_goal(tdee, deficit);
        assert_eq!(round_kcal(goal), 2006);
    }

    #[test]
    fn test_deficit_negative_when_gaining() {
        let deficit = calculate_daily_deficit(70.0, 72.0, 10.0);
        assert!(deficit < 0.0);
        assert!(approx_eq(deficit, -220.0, 1e-9));
    }

    #[test]
    fn test_kj_uses_rounded_kcal() {
        // 2006 × 4.184 = 8393.104
        assert_eq!(kcal_to_kj(2006), 8393);
        // 1649 × 4.184 = 6899.416
        assert_eq!(kcal_to_kj(1649), 6899);
    }

    #[test]
    fn test_unit_normalization() {
        assert!(approx_eq(lb_to_kg(220.462), 100.0, 1e-9));
        assert!(approx_eq(kg_to_lb(100.0), 220.462, 1e-9));
        // 5 ft 9 in = 152.4 + 22.86
        assert!(approx_eq(feet_inches_to_cm(5.0, 9.0), 175.26, 1e-9));
        assert!(approx_eq(months_to_weeks(3.0), 13.035, 1e-9));
    }

    #[test]
    fn test_exercise_burn_reference() {
        // round(8.0 × 1.0 × (1649/24) × 0.5) = round(274.83) = 275
        assert_eq!(calculate_exercise_burn(8.0, Intensity::Medium, 1649.0, 30.0), 275.0);
    }

    #[test]
    fn test_exercise_burn_intensity_scaling() {
        let low = calculate_exercise_burn(8.0, Intensity::Low, 1649.0, 30.0);
        let high = calculate_exercise_burn(8.0, Intensity::High, 1649.0, 30.0);
        // 274.83 × 0.8 = 219.87, × 1.2 = 329.80
        assert_eq!(low, 220.0);
        assert_eq!(high, 330.0);
        assert_eq!(calculate_exercise_burn(8.0, Intensity::High, 1649.0, 0.0), 0.0);
    }

    #[test]
    fn test_portion_calories_per_100g() {
        // 165 kcal per 100g, 150 g entered: 1.65 × 150 × 0.01
        let cal = calculate_portion_calories(165.0, BaseUnit::Per100g, 150.0, PortionUnit::Grams);
        assert!(approx_eq(cal, 2.475, 1e-9));
    }

    #[test]
    fn test_portion_calories_per_cup() {
        // 206 kcal per cup, 2 cups entered: 206 × 2 × 2.4
        let cal = calculate_portion_calories(206.0, BaseUnit::Cup, 2.0, PortionUnit::Cup);
        assert!(approx_eq(cal, 988.8, 1e-9));
        let cal = calculate_portion_calories(78.0, BaseUnit::Unit, 3.0, PortionUnit::Unit);
        assert!(approx_eq(cal, 234.0, 1e-9));
    }

    #[test]
    fn test_unit_parsing() {
        use std::str::FromStr;
        assert_eq!(PortionUnit::from_str("g").unwrap(), PortionUnit::Grams);
        assert_eq!(PortionUnit::from_str("TBSP").unwrap(), PortionUnit::Tbsp);
        assert!(PortionUnit::from_str("litre").is_err());
        assert_eq!(Intensity::from_str("high").unwrap(), Intensity::High);
        assert!(Intensity::from_str("extreme").is_err());
    }
}
