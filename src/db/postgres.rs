use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, FromRow, PgPool};
use std::collections::HashMap;

use super::Repository;
use crate::{
    error::{AppError, AppResult},
    models::{
        FoodFlag, Ingredient, Interaction, InteractionKind, NewIngredient, NewRecipe, NewUser,
        Rating, RatingRequest, Recipe, RecipeQuery, User,
    },
};

/// Creates a PostgreSQL connection pool
///
/// Establishes a pool of database connections for efficient reuse.
/// The pool automatically manages connection lifecycle and limits.
pub async fn create_pool(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;

    Ok(pool)
}

/// Applies the embedded schema migrations
pub async fn run_migrations(pool: &PgPool) -> AppResult<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    tracing::info!("Database migrations applied");
    Ok(())
}

const USER_COLUMNS: &str = "id, email, hashed_password, is_active, is_admin, created_at, \
     dietary_restrictions, favorite_cuisines, allergies, food_flags";

const RECIPE_COLUMNS: &str = "id, title, description, instructions, prep_time, cook_time, \
     servings, calories, image_url, protein, carbs, fat, fiber, sodium, sugar, cuisine, tags, \
     food_flags, created_at";

const INTERACTION_COLUMNS: &str = "id, user_id, recipe_id, interaction_type, occurred_at";

#[derive(FromRow)]
struct RecipeRow {
    id: i64,
    title: String,
    description: String,
    instructions: String,
    prep_time: i32,
    cook_time: i32,
    servings: i32,
    calories: i32,
    image_url: Option<String>,
    protein: f64,
    carbs: f64,
    fat: f64,
    fiber: f64,
    sodium: f64,
    sugar: f64,
    cuisine: Option<String>,
    tags: Vec<String>,
    food_flags: Vec<String>,
    created_at: DateTime<Utc>,
}

impl RecipeRow {
    fn into_recipe(self, ingredients: Vec<Ingredient>) -> Recipe {
        Recipe {
            id: self.id,
            title: self.title,
            description: self.description,
            instructions: self.instructions,
            prep_time: self.prep_time,
            cook_time: self.cook_time,
            servings: self.servings,
            calories: self.calories,
            image_url: self.image_url,
            protein: self.protein,
            carbs: self.carbs,
            fat: self.fat,
            fiber: self.fiber,
            sodium: self.sodium,
            sugar: self.sugar,
            cuisine: self.cuisine,
            tags: self.tags,
            food_flags: self.food_flags,
            created_at: self.created_at,
            ingredients,
        }
    }
}

#[derive(FromRow)]
struct RecipeIngredientRow {
    recipe_id: i64,
    #[sqlx(flatten)]
    ingredient: Ingredient,
}

#[derive(FromRow)]
struct InteractionRow {
    id: i64,
    user_id: i64,
    recipe_id: i64,
    interaction_type: String,
    occurred_at: DateTime<Utc>,
}

impl TryFrom<InteractionRow> for Interaction {
    type Error = AppError;

    fn try_from(row: InteractionRow) -> Result<Self, Self::Error> {
        Ok(Interaction {
            id: row.id,
            user_id: row.user_id,
            recipe_id: row.recipe_id,
            interaction_type: row.interaction_type.parse()?,
            timestamp: row.occurred_at,
        })
    }
}

/// Maps unique-constraint violations to `Conflict`
fn conflict_on_unique(err: sqlx::Error, message: &str) -> AppError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return AppError::Conflict(message.to_string());
        }
    }
    AppError::Database(err)
}

/// Escapes LIKE metacharacters so user input matches literally
fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Repository backed by PostgreSQL
#[derive(Clone)]
pub struct PgRepository {
    pool: PgPool,
}

impl PgRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn ensure_recipe(&self, recipe_id: i64) -> AppResult<()> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM recipes WHERE id = $1)")
            .bind(recipe_id)
            .fetch_one(&self.pool)
            .await?;
        if exists {
            Ok(())
        } else {
            Err(AppError::NotFound(format!("Recipe {} not found", recipe_id)))
        }
    }

    /// Loads ingredient lists for the given rows and assembles recipes
    async fn with_ingredients(&self, rows: Vec<RecipeRow>) -> AppResult<Vec<Recipe>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        let links = sqlx::query_as::<_, RecipeIngredientRow>(
            r#"
            SELECT ri.recipe_id, i.id, i.name, i.category, i.common_allergens, i.source
            FROM recipe_ingredients ri
            JOIN ingredients i ON i.id = ri.ingredient_id
            WHERE ri.recipe_id = ANY($1)
            ORDER BY i.id
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_recipe: HashMap<i64, Vec<Ingredient>> = HashMap::new();
        for link in links {
            by_recipe
                .entry(link.recipe_id)
                .or_default()
                .push(link.ingredient);
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let ingredients = by_recipe.remove(&row.id).unwrap_or_default();
                row.into_recipe(ingredients)
            })
            .collect())
    }

    async fn fetch_interactions(&self, sql: &str, user_id: Option<i64>) -> AppResult<Vec<Interaction>> {
        let mut query = sqlx::query_as::<_, InteractionRow>(sql);
        if let Some(user_id) = user_id {
            query = query.bind(user_id);
        }
        query
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Interaction::try_from)
            .collect()
    }
}

#[async_trait]
impl Repository for PgRepository {
    async fn create_user(&self, user: NewUser) -> AppResult<User> {
        let sql = format!(
            r#"
            INSERT INTO users (email, hashed_password, is_admin, dietary_restrictions,
                               favorite_cuisines, allergies, food_flags)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {USER_COLUMNS}
            "#
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(&user.email)
            .bind(&user.hashed_password)
            .bind(user.is_admin)
            .bind(&user.preferences.dietary_restrictions)
            .bind(&user.preferences.favorite_cuisines)
            .bind(&user.preferences.allergies)
            .bind(&user.preferences.food_flags)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| conflict_on_unique(e, "Email already registered"))
    }

    async fn get_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE lower(email) = lower($1)");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn update_user(&self, user: &User) -> AppResult<User> {
        let sql = format!(
            r#"
            UPDATE users
            SET email = $2, hashed_password = $3, is_active = $4, is_admin = $5,
                dietary_restrictions = $6, favorite_cuisines = $7, allergies = $8, food_flags = $9
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(user.id)
            .bind(&user.email)
            .bind(&user.hashed_password)
            .bind(user.is_active)
            .bind(user.is_admin)
            .bind(&user.dietary_restrictions)
            .bind(&user.favorite_cuisines)
            .bind(&user.allergies)
            .bind(&user.food_flags)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| conflict_on_unique(e, "Email already registered"))?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", user.id)))
    }

    async fn create_ingredient(&self, ingredient: NewIngredient) -> AppResult<Ingredient> {
        sqlx::query_as::<_, Ingredient>(
            r#"
            INSERT INTO ingredients (name, category, common_allergens, source)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, category, common_allergens, source
            "#,
        )
        .bind(&ingredient.name)
        .bind(&ingredient.category)
        .bind(&ingredient.common_allergens)
        .bind(&ingredient.source)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            conflict_on_unique(e, &format!("Ingredient '{}' already exists", ingredient.name))
        })
    }

    async fn insert_missing_ingredients(&self, ingredients: &[NewIngredient]) -> AppResult<usize> {
        let mut tx = self.pool.begin().await?;
        let mut inserted = 0;

        for ingredient in ingredients {
            let result = sqlx::query(
                r#"
                INSERT INTO ingredients (name, category, common_allergens, source)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT ((lower(name))) DO NOTHING
                "#,
            )
            .bind(&ingredient.name)
            .bind(&ingredient.category)
            .bind(&ingredient.common_allergens)
            .bind(&ingredient.source)
            .execute(&mut *tx)
            .await?;
            inserted += result.rows_affected() as usize;
        }

        tx.commit().await?;
        Ok(inserted)
    }

    async fn search_ingredients(&self, query: &str, limit: i64) -> AppResult<Vec<Ingredient>> {
        let pattern = format!("%{}%", escape_like(query));
        Ok(sqlx::query_as::<_, Ingredient>(
            r#"
            SELECT id, name, category, common_allergens, source
            FROM ingredients
            WHERE name ILIKE $1
            ORDER BY name
            LIMIT $2
            "#,
        )
        .bind(pattern)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn create_recipe(&self, recipe: NewRecipe) -> AppResult<Recipe> {
        let mut tx = self.pool.begin().await?;

        let ingredients = sqlx::query_as::<_, Ingredient>(
            r#"
            SELECT id, name, category, common_allergens, source
            FROM ingredients
            WHERE id = ANY($1)
            ORDER BY id
            "#,
        )
        .bind(&recipe.ingredients)
        .fetch_all(&mut *tx)
        .await?;

        if let Some(missing) = recipe
            .ingredients
            .iter()
            .find(|id| !ingredients.iter().any(|i| i.id == **id))
        {
            return Err(AppError::InvalidInput(format!(
                "Unknown ingredient id {}",
                missing
            )));
        }

        let food_flags = FoodFlag::compute_names(&recipe.nutrition());
        let sql = format!(
            r#"
            INSERT INTO recipes (title, description, instructions, prep_time, cook_time, servings,
                                 calories, image_url, protein, carbs, fat, fiber, sodium, sugar,
                                 cuisine, tags, food_flags)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            RETURNING {RECIPE_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, RecipeRow>(&sql)
            .bind(&recipe.title)
            .bind(&recipe.description)
            .bind(&recipe.instructions)
            .bind(recipe.prep_time)
            .bind(recipe.cook_time)
            .bind(recipe.servings)
            .bind(recipe.calories)
            .bind(&recipe.image_url)
            .bind(recipe.protein)
            .bind(recipe.carbs)
            .bind(recipe.fat)
            .bind(recipe.fiber)
            .bind(recipe.sodium)
            .bind(recipe.sugar)
            .bind(&recipe.cuisine)
            .bind(&recipe.tags)
            .bind(&food_flags)
            .fetch_one(&mut *tx)
            .await?;

        if !recipe.ingredients.is_empty() {
            sqlx::query(
                "INSERT INTO recipe_ingredients (recipe_id, ingredient_id) SELECT $1, UNNEST($2::BIGINT[])",
            )
            .bind(row.id)
            .bind(&recipe.ingredients)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(row.into_recipe(ingredients))
    }

    async fn get_recipe(&self, id: i64) -> AppResult<Option<Recipe>> {
        Ok(self.get_recipes(&[id]).await?.into_iter().next())
    }

    async fn get_recipes(&self, ids: &[i64]) -> AppResult<Vec<Recipe>> {
        let sql = format!("SELECT {RECIPE_COLUMNS} FROM recipes WHERE id = ANY($1)");
        let rows = sqlx::query_as::<_, RecipeRow>(&sql)
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;

        let mut by_id: HashMap<i64, Recipe> = self
            .with_ingredients(rows)
            .await?
            .into_iter()
            .map(|r| (r.id, r))
            .collect();
        Ok(ids.iter().filter_map(|id| by_id.remove(id)).collect())
    }

    async fn list_recipes(&self, query: &RecipeQuery) -> AppResult<Vec<Recipe>> {
        let sql = format!(
            r#"
            SELECT {RECIPE_COLUMNS} FROM recipes
            WHERE ($1::TEXT IS NULL OR cuisine = $1)
            ORDER BY id
            OFFSET $2 LIMIT $3
            "#
        );
        let rows = sqlx::query_as::<_, RecipeRow>(&sql)
            .bind(query.cuisine_filter())
            .bind(query.offset())
            .bind(query.page_size())
            .fetch_all(&self.pool)
            .await?;
        self.with_ingredients(rows).await
    }

    async fn all_recipes(&self) -> AppResult<Vec<Recipe>> {
        let sql = format!("SELECT {RECIPE_COLUMNS} FROM recipes ORDER BY id");
        let rows = sqlx::query_as::<_, RecipeRow>(&sql)
            .fetch_all(&self.pool)
            .await?;
        self.with_ingredients(rows).await
    }

    async fn add_interaction(
        &self,
        user_id: i64,
        recipe_id: i64,
        kind: InteractionKind,
    ) -> AppResult<Interaction> {
        self.ensure_recipe(recipe_id).await?;

        let sql = format!(
            r#"
            INSERT INTO user_recipe_interactions (user_id, recipe_id, interaction_type)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, recipe_id) WHERE interaction_type = 'save' DO NOTHING
            RETURNING {INTERACTION_COLUMNS}
            "#
        );
        let inserted = sqlx::query_as::<_, InteractionRow>(&sql)
            .bind(user_id)
            .bind(recipe_id)
            .bind(kind.as_str())
            .fetch_optional(&self.pool)
            .await?;

        let row = match inserted {
            Some(row) => row,
            None => {
                // Conflict only happens for an existing save
                let sql = format!(
                    r#"
                    SELECT {INTERACTION_COLUMNS} FROM user_recipe_interactions
                    WHERE user_id = $1 AND recipe_id = $2 AND interaction_type = $3
                    "#
                );
                sqlx::query_as::<_, InteractionRow>(&sql)
                    .bind(user_id)
                    .bind(recipe_id)
                    .bind(kind.as_str())
                    .fetch_one(&self.pool)
                    .await?
            }
        };

        row.try_into()
    }

    async fn remove_interaction(
        &self,
        user_id: i64,
        recipe_id: i64,
        kind: InteractionKind,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            DELETE FROM user_recipe_interactions
            WHERE user_id = $1 AND recipe_id = $2 AND interaction_type = $3
            "#,
        )
        .bind(user_id)
        .bind(recipe_id)
        .bind(kind.as_str())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn user_interactions(&self, user_id: i64) -> AppResult<Vec<Interaction>> {
        let sql = format!(
            "SELECT {INTERACTION_COLUMNS} FROM user_recipe_interactions WHERE user_id = $1 ORDER BY id"
        );
        self.fetch_interactions(&sql, Some(user_id)).await
    }

    async fn all_interactions(&self) -> AppResult<Vec<Interaction>> {
        let sql = format!("SELECT {INTERACTION_COLUMNS} FROM user_recipe_interactions ORDER BY id");
        self.fetch_interactions(&sql, None).await
    }

    async fn favorite_recipes(&self, user_id: i64) -> AppResult<Vec<Recipe>> {
        let ids: Vec<i64> = sqlx::query_scalar(
            r#"
            SELECT recipe_id FROM user_recipe_interactions
            WHERE user_id = $1 AND interaction_type = 'save'
            ORDER BY id
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        self.get_recipes(&ids).await
    }

    async fn upsert_rating(
        &self,
        user_id: i64,
        recipe_id: i64,
        rating: &RatingRequest,
    ) -> AppResult<Rating> {
        self.ensure_recipe(recipe_id).await?;

        Ok(sqlx::query_as::<_, Rating>(
            r#"
            INSERT INTO ratings (user_id, recipe_id, rating, comment)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id, recipe_id)
            DO UPDATE SET rating = EXCLUDED.rating, comment = EXCLUDED.comment, created_at = now()
            RETURNING id, user_id, recipe_id, rating, comment, created_at
            "#,
        )
        .bind(user_id)
        .bind(recipe_id)
        .bind(rating.rating)
        .bind(&rating.comment)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn user_ratings(&self, user_id: i64) -> AppResult<Vec<Rating>> {
        Ok(sqlx::query_as::<_, Rating>(
            "SELECT id, user_id, recipe_id, rating, comment, created_at FROM ratings WHERE user_id = $1 ORDER BY id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn all_ratings(&self) -> AppResult<Vec<Rating>> {
        Ok(sqlx::query_as::<_, Rating>(
            "SELECT id, user_id, recipe_id, rating, comment, created_at FROM ratings ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("tomato"), "tomato");
        assert_eq!(escape_like("100%_pure\\"), "100\\%\\_pure\\\\");
    }
}
