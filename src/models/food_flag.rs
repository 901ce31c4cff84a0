use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};

const HIGH_SODIUM_MG: f64 = 500.0;
const HIGH_SUGAR_G: f64 = 25.0;
const HIGH_FAT_G: f64 = 20.0;
const HIGH_CALORIES_KCAL: f64 = 500.0;
const HIGH_CARBS_G: f64 = 50.0;
const LOW_PROTEIN_G: f64 = 10.0;

/// Derived nutrition label a user can choose to avoid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FoodFlag {
    HighSodium,
    HighSugar,
    HighFat,
    HighCalories,
    HighCarbs,
    LowProtein,
}

impl FoodFlag {
    pub const ALL: [FoodFlag; 6] = [
        FoodFlag::HighSodium,
        FoodFlag::HighSugar,
        FoodFlag::HighFat,
        FoodFlag::HighCalories,
        FoodFlag::HighCarbs,
        FoodFlag::LowProtein,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FoodFlag::HighSodium => "high_sodium",
            FoodFlag::HighSugar => "high_sugar",
            FoodFlag::HighFat => "high_fat",
            FoodFlag::HighCalories => "high_calories",
            FoodFlag::HighCarbs => "high_carbs",
            FoodFlag::LowProtein => "low_protein",
        }
    }

    /// Whether the nutrition facts cross this flag's threshold
    pub fn applies_to(&self, facts: &NutritionFacts) -> bool {
        match self {
            FoodFlag::HighSodium => facts.sodium > HIGH_SODIUM_MG,
            FoodFlag::HighSugar => facts.sugar > HIGH_SUGAR_G,
            FoodFlag::HighFat => facts.fat > HIGH_FAT_G,
            FoodFlag::HighCalories => facts.calories > HIGH_CALORIES_KCAL,
            FoodFlag::HighCarbs => facts.carbs > HIGH_CARBS_G,
            FoodFlag::LowProtein => facts.protein < LOW_PROTEIN_G,
        }
    }

    /// All flags raised by the given nutrition facts, in declaration order
    pub fn compute(facts: &NutritionFacts) -> Vec<FoodFlag> {
        Self::ALL
            .iter()
            .copied()
            .filter(|flag| flag.applies_to(facts))
            .collect()
    }

    /// Flag names as stored on recipes
    pub fn compute_names(facts: &NutritionFacts) -> Vec<String> {
        Self::compute(facts)
            .into_iter()
            .map(|flag| flag.as_str().to_string())
            .collect()
    }
}

impl Display for FoodFlag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for FoodFlag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|flag| flag.as_str() == needle)
            .ok_or_else(|| format!("Unknown food flag: {}", s))
    }
}

/// Per-serving nutrition used for flagging and scoring
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NutritionFacts {
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
    pub fiber: f64,
    /// milligrams
    pub sodium: f64,
    pub sugar: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn balanced() -> NutritionFacts {
        NutritionFacts {
            calories: 400.0,
            protein: 25.0,
            carbs: 40.0,
            fat: 12.0,
            fiber: 6.0,
            sodium: 300.0,
            sugar: 8.0,
        }
    }

    #[test]
    fn test_balanced_recipe_has_no_flags() {
        assert!(FoodFlag::compute(&balanced()).is_empty());
    }

    #[test]
    fn test_every_threshold() {
        let facts = NutritionFacts {
            calories: 820.0,
            protein: 4.0,
            carbs: 95.0,
            fat: 31.0,
            fiber: 1.0,
            sodium: 1200.0,
            sugar: 40.0,
        };

        assert_eq!(FoodFlag::compute(&facts), FoodFlag::ALL.to_vec());
    }

    #[test]
    fn test_thresholds_are_strict() {
        let facts = NutritionFacts {
            calories: 500.0,
            protein: 10.0,
            carbs: 50.0,
            fat: 20.0,
            fiber: 0.0,
            sodium: 500.0,
            sugar: 25.0,
        };

        assert!(FoodFlag::compute(&facts).is_empty());
    }

    #[test]
    fn test_compute_names() {
        let facts = NutritionFacts {
            sodium: 750.0,
            ..balanced()
        };
        assert_eq!(FoodFlag::compute_names(&facts), vec!["high_sodium"]);
    }

    #[test]
    fn test_parse_flag() {
        assert_eq!("High_Sugar".parse::<FoodFlag>(), Ok(FoodFlag::HighSugar));
        assert!("spicy".parse::<FoodFlag>().is_err());
    }
}
