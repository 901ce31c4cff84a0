pub mod food_flag;
pub mod ingredient;
pub mod interaction;
pub mod recipe;
pub mod recommendation;
pub mod user;
pub mod user_preferences;

pub use food_flag::{FoodFlag, NutritionFacts};
pub use ingredient::{Ingredient, IngredientSearchQuery, NewIngredient};
pub use interaction::{Interaction, InteractionKind, InteractionRequest, Rating, RatingRequest};
pub use recipe::{NewRecipe, Recipe, RecipeQuery};
pub use recommendation::{
    NutritionalInfo, RecipeRecommendation, RecommendationQuery, TrainingSummary,
};
pub use user::{LoginForm, NewUser, RegisterRequest, Token, User, UserResponse, UserUpdate};
pub use user_preferences::UserPreferences;
