use crate::models::{Recipe, RecipeRecommendation, UserPreferences};

/// Added to the score of recipes from a favorite cuisine
pub const CUISINE_BOOST: f64 = 0.2;

/// Whether a recipe satisfies the user's hard constraints
///
/// A recipe tagged with one of the user's dietary restrictions is excluded,
/// untagged recipes pass. No ingredient may carry one of the user's
/// allergens, and none of the recipe's computed food flags may be one the
/// user avoids.
pub fn is_allowed(recipe: &Recipe, prefs: &UserPreferences) -> bool {
    if prefs
        .dietary_restrictions
        .iter()
        .any(|restriction| recipe.has_tag(restriction))
    {
        return false;
    }

    if !prefs.allergies.is_empty()
        && recipe
            .ingredients
            .iter()
            .any(|ingredient| ingredient.contains_any_allergen(&prefs.allergies))
    {
        return false;
    }

    !recipe
        .computed_flags()
        .iter()
        .any(|flag| prefs.food_flags.contains(flag))
}

pub fn filter_by_preferences(
    scored: Vec<(Recipe, f64)>,
    prefs: &UserPreferences,
) -> Vec<RecipeRecommendation> {
    scored
        .into_iter()
        .filter(|(recipe, _)| is_allowed(recipe, prefs))
        .map(|(recipe, score)| {
            let favorite = recipe
                .cuisine
                .as_ref()
                .is_some_and(|c| prefs.favorite_cuisines.contains(c));
            let score = if favorite { score + CUISINE_BOOST } else { score };
            RecipeRecommendation::from_recipe(&recipe, score)
        })
        .collect()
}

/// Orders by score descending, ties by id ascending, and keeps `n`
pub fn rank(mut recommendations: Vec<RecipeRecommendation>, n: usize) -> Vec<RecipeRecommendation> {
    recommendations.sort_by(|a, b| {
        b.match_score
            .total_cmp(&a.match_score)
            .then(a.id.cmp(&b.id))
    });
    recommendations.truncate(n);
    recommendations
}
