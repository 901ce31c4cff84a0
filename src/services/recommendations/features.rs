use serde::{Deserialize, Serialize};

use crate::models::Recipe;

/// Column order of a recipe feature vector
pub const FEATURE_NAMES: [&str; 8] = [
    "calories",
    "protein",
    "carbs",
    "fat",
    "fiber",
    "prep_time",
    "cook_time",
    "servings",
];

pub fn raw_features(recipe: &Recipe) -> Vec<f64> {
    vec![
        f64::from(recipe.calories),
        recipe.protein,
        recipe.carbs,
        recipe.fat,
        recipe.fiber,
        f64::from(recipe.prep_time),
        f64::from(recipe.cook_time),
        f64::from(recipe.servings),
    ]
}

/// Per-column standardization fitted on the whole catalog
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeatureScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl FeatureScaler {
    /// Fits mean and population standard deviation per column
    ///
    /// Columns with zero deviation get a scale of 1 so they center to 0.
    pub fn fit(rows: &[Vec<f64>]) -> Self {
        let width = FEATURE_NAMES.len();
        if rows.is_empty() {
            return Self {
                mean: vec![0.0; width],
                scale: vec![1.0; width],
            };
        }

        let n = rows.len() as f64;
        let mut mean = vec![0.0; width];
        for row in rows {
            for (m, v) in mean.iter_mut().zip(row) {
                *m += v;
            }
        }
        mean.iter_mut().for_each(|m| *m /= n);

        let mut variance = vec![0.0; width];
        for row in rows {
            for ((var, v), m) in variance.iter_mut().zip(row).zip(&mean) {
                *var += (v - m).powi(2);
            }
        }

        let scale = variance
            .into_iter()
            .map(|var| {
                let std = (var / n).sqrt();
                if std > f64::EPSILON {
                    std
                } else {
                    1.0
                }
            })
            .collect();

        Self { mean, scale }
    }

    pub fn transform(&self, row: &[f64]) -> Vec<f64> {
        row.iter()
            .zip(&self.mean)
            .zip(&self.scale)
            .map(|((v, m), s)| (v - m) / s)
            .collect()
    }

    pub fn transform_recipe(&self, recipe: &Recipe) -> Vec<f64> {
        self.transform(&raw_features(recipe))
    }
}

/// Cosine similarity, 0 when either vector has zero norm
pub fn cosine(a: &[f64], b: &[f64]) -> f64 {
    let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f64>().sqrt();

    if norm_a <= f64::EPSILON || norm_b <= f64::EPSILON {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}
