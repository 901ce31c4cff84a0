use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::models::{Interaction, Rating};

/// recipe id -> summed interaction weight
pub type History = BTreeMap<i64, f64>;

/// Scored reference to another user or recipe
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Neighbor {
    pub id: i64,
    pub score: f64,
}

/// Sorts by score descending, ties by id ascending, and keeps the first `k`
pub fn top_k(mut neighbors: Vec<Neighbor>, k: usize) -> Vec<Neighbor> {
    neighbors.sort_by(|a, b| b.score.total_cmp(&a.score).then(a.id.cmp(&b.id)));
    neighbors.truncate(k);
    neighbors
}

/// Sums view/save/cook weights and rating values per (user, recipe)
pub fn interaction_weights(
    interactions: &[Interaction],
    ratings: &[Rating],
) -> BTreeMap<i64, History> {
    let mut weights: BTreeMap<i64, History> = BTreeMap::new();

    for interaction in interactions {
        *weights
            .entry(interaction.user_id)
            .or_default()
            .entry(interaction.recipe_id)
            .or_insert(0.0) += interaction.interaction_type.weight();
    }
    for rating in ratings {
        *weights
            .entry(rating.user_id)
            .or_default()
            .entry(rating.recipe_id)
            .or_insert(0.0) += f64::from(rating.rating);
    }

    weights
}

/// Top-k cosine neighbors per user over their weight vectors
///
/// Only users sharing at least one recipe are compared, via an
/// item -> users inverted index. Non-positive similarities are dropped.
pub fn similar_users(weights: &BTreeMap<i64, History>, k: usize) -> BTreeMap<i64, Vec<Neighbor>> {
    let norms: HashMap<i64, f64> = weights
        .iter()
        .map(|(user, history)| (*user, history.values().map(|w| w * w).sum::<f64>().sqrt()))
        .collect();

    let mut by_item: HashMap<i64, Vec<(i64, f64)>> = HashMap::new();
    for (user, history) in weights {
        for (recipe, weight) in history {
            by_item.entry(*recipe).or_default().push((*user, *weight));
        }
    }

    let mut result = BTreeMap::new();
    for (user, history) in weights {
        let mut dots: HashMap<i64, f64> = HashMap::new();
        for (recipe, weight) in history {
            if let Some(users) = by_item.get(recipe) {
                for (other, other_weight) in users {
                    if other != user {
                        *dots.entry(*other).or_insert(0.0) += weight * other_weight;
                    }
                }
            }
        }

        let norm = norms.get(user).copied().unwrap_or(0.0);
        let neighbors: Vec<Neighbor> = dots
            .into_iter()
            .filter_map(|(other, dot)| {
                let denom = norm * norms.get(&other).copied().unwrap_or(0.0);
                if denom <= f64::EPSILON {
                    return None;
                }
                let score = dot / denom;
                (score > 0.0).then_some(Neighbor { id: other, score })
            })
            .collect();

        if !neighbors.is_empty() {
            result.insert(*user, top_k(neighbors, k));
        }
    }

    result
}

/// Neighbor-weighted scores for recipes absent from `history`, scaled into [0, 1]
pub fn collaborative_scores(
    history: &History,
    neighbors: &[Neighbor],
    weights: &BTreeMap<i64, History>,
) -> HashMap<i64, f64> {
    let mut scores: HashMap<i64, f64> = HashMap::new();

    for neighbor in neighbors {
        let Some(neighbor_history) = weights.get(&neighbor.id) else {
            continue;
        };
        for (recipe, weight) in neighbor_history {
            if !history.contains_key(recipe) {
                *scores.entry(*recipe).or_insert(0.0) += neighbor.score * weight;
            }
        }
    }

    let max = scores.values().copied().fold(0.0, f64::max);
    if max > 0.0 {
        scores.values_mut().for_each(|s| *s /= max);
    }
    scores
}
