use axum::http::{header, HeaderValue, StatusCode};
use axum_test::{TestRequest, TestServer};
use serde_json::{json, Value};
use std::sync::Arc;

use food_rec_api::{
    config::Config,
    db::{MemoryRepository, Repository},
    routes::{create_router, AppState},
};

struct TestApp {
    server: TestServer,
    repo: Arc<MemoryRepository>,
    _model_dir: tempfile::TempDir,
}

fn create_test_app() -> TestApp {
    let model_dir = tempfile::tempdir().unwrap();
    let config = Config {
        bcrypt_cost: 4,
        secret_key: "test_secret_key".to_string(),
        admin_emails: vec!["admin@example.com".to_string()],
        model_path: model_dir
            .path()
            .join("index.json")
            .to_string_lossy()
            .into_owned(),
        ..Config::default()
    };

    let repo = Arc::new(MemoryRepository::new());
    let state = Arc::new(AppState::new(repo.clone(), None, config));
    TestApp {
        server: TestServer::new(create_router(state)).unwrap(),
        repo,
        _model_dir: model_dir,
    }
}

fn bearer(request: TestRequest, token: &str) -> TestRequest {
    request.add_header(
        header::AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
    )
}

async fn register_and_login(server: &TestServer, email: &str) -> String {
    let response = server
        .post("/api/v1/auth/register")
        .json(&json!({ "email": email, "password": "testpassword" }))
        .await;
    response.assert_status(StatusCode::CREATED);

    let response = server
        .post("/api/v1/auth/login")
        .form(&[("username", email), ("password", "testpassword")])
        .await;
    response.assert_status_ok();
    let token: Value = response.json();
    assert_eq!(token["token_type"], "bearer");
    token["access_token"].as_str().unwrap().to_string()
}

async fn create_recipe(server: &TestServer, token: &str, recipe: Value) -> i64 {
    let response = bearer(server.post("/api/v1/recipes"), token)
        .json(&recipe)
        .await;
    response.assert_status(StatusCode::CREATED);
    let created: Value = response.json();
    created["id"].as_i64().unwrap()
}

fn light_recipe(title: &str, calories: i32) -> Value {
    json!({
        "title": title,
        "description": "Fresh and light",
        "calories": calories,
        "protein": 12.0,
        "carbs": 20.0,
        "fat": 5.0,
        "fiber": 6.0,
        "prep_time": 10,
        "cook_time": 5,
        "servings": 2,
        "cuisine": "mediterranean",
        "tags": ["vegetarian"]
    })
}

fn heavy_recipe(title: &str) -> Value {
    json!({
        "title": title,
        "calories": 900,
        "protein": 40.0,
        "carbs": 80.0,
        "fat": 45.0,
        "sodium": 1200.0,
        "prep_time": 30,
        "cook_time": 90,
        "servings": 6,
        "cuisine": "italian"
    })
}

#[tokio::test]
async fn test_health_and_root() {
    let app = create_test_app();

    let response = app.server.get("/health").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "healthy");

    let response = app.server.get("/").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert!(body["message"].as_str().unwrap().contains("Food Recommendation"));
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let app = create_test_app();
    let response = app
        .server
        .get("/health")
        .add_header(
            header::HeaderName::from_static("x-request-id"),
            HeaderValue::from_static("req-123"),
        )
        .await;
    assert_eq!(response.header("x-request-id"), "req-123");
}

#[tokio::test]
async fn test_register_login_and_profile() {
    let app = create_test_app();
    let token = register_and_login(&app.server, "Cook@Example.com").await;

    let response = bearer(app.server.get("/api/v1/users/me"), &token).await;
    response.assert_status_ok();
    let me: Value = response.json();
    assert_eq!(me["email"], "cook@example.com");
    assert_eq!(me["is_admin"], false);
    assert!(me.get("hashed_password").is_none());

    let response = app
        .server
        .post("/api/v1/auth/register")
        .json(&json!({ "email": "cook@example.com", "password": "testpassword" }))
        .await;
    response.assert_status(StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_register_validation() {
    let app = create_test_app();
    let response = app
        .server
        .post("/api/v1/auth/register")
        .json(&json!({ "email": "cook@example.com", "password": "short" }))
        .await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);

    let response = app
        .server
        .post("/api/v1/auth/register")
        .json(&json!({ "email": "not-an-email", "password": "testpassword" }))
        .await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_login_rejects_wrong_password() {
    let app = create_test_app();
    register_and_login(&app.server, "cook@example.com").await;

    let response = app
        .server
        .post("/api/v1/auth/login")
        .form(&[("username", "cook@example.com"), ("password", "wrongpassword")])
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    let body: Value = response.json();
    assert_eq!(body["error"], "Incorrect email or password");
}

#[tokio::test]
async fn test_protected_routes_require_token() {
    let app = create_test_app();

    let response = app.server.get("/api/v1/users/me").await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(response.header("www-authenticate"), "Bearer");

    let response = bearer(app.server.get("/api/v1/users/me"), "invalid_token").await;
    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_inactive_user_is_rejected() {
    let app = create_test_app();
    let token = register_and_login(&app.server, "cook@example.com").await;

    let mut user = app
        .repo
        .get_user_by_email("cook@example.com")
        .await
        .unwrap()
        .unwrap();
    user.is_active = false;
    app.repo.update_user(&user).await.unwrap();

    let response = bearer(app.server.get("/api/v1/users/me"), &token).await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], "Inactive user");

    let response = app
        .server
        .post("/api/v1/auth/login")
        .form(&[("username", "cook@example.com"), ("password", "testpassword")])
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], "Inactive user");

    // a wrong password still reads as bad credentials
    app.server
        .post("/api/v1/auth/login")
        .form(&[("username", "cook@example.com"), ("password", "wrongpassword")])
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_malformed_requests_return_json_errors() {
    let app = create_test_app();

    let response = app.server.get("/api/v1/recipes/abc").await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert!(body["error"].as_str().unwrap().contains("abc"));

    let response = app
        .server
        .get("/api/v1/recommendations/similar/1?n_recommendations=-1")
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert!(body["error"].is_string());

    let response = app
        .server
        .post("/api/v1/auth/register")
        .json(&json!({ "password": "testpassword" }))
        .await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = response.json();
    assert!(body["error"].as_str().unwrap().contains("email"));

    let response = app
        .server
        .post("/api/v1/auth/register")
        .text("email=cook@example.com")
        .await;
    response.assert_status(StatusCode::UNSUPPORTED_MEDIA_TYPE);
    let body: Value = response.json();
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_update_profile_and_preferences() {
    let app = create_test_app();
    let token = register_and_login(&app.server, "cook@example.com").await;
    register_and_login(&app.server, "taken@example.com").await;

    let response = bearer(app.server.put("/api/v1/users/me"), &token)
        .json(&json!({ "favorite_cuisines": ["Italian", "italian"] }))
        .await;
    response.assert_status_ok();
    let me: Value = response.json();
    assert_eq!(me["favorite_cuisines"], json!(["italian"]));

    let response = bearer(app.server.put("/api/v1/users/me"), &token)
        .json(&json!({ "email": "taken@example.com" }))
        .await;
    response.assert_status(StatusCode::CONFLICT);

    let prefs = json!({
        "dietary_restrictions": ["vegetarian"],
        "favorite_cuisines": ["thai"],
        "allergies": ["peanuts"],
        "food_flags": ["high_sodium"]
    });
    let response = bearer(app.server.put("/api/v1/users/me/preferences"), &token)
        .json(&prefs)
        .await;
    response.assert_status_ok();

    let response = bearer(app.server.get("/api/v1/users/me/preferences"), &token).await;
    response.assert_status_ok();
    let stored: Value = response.json();
    assert_eq!(stored, prefs);

    let response = bearer(app.server.put("/api/v1/users/me/preferences"), &token)
        .json(&json!({ "food_flags": ["very_spicy"] }))
        .await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_recipe_lifecycle() {
    let app = create_test_app();
    let token = register_and_login(&app.server, "cook@example.com").await;

    let response = app.server.post("/api/v1/recipes").json(&heavy_recipe("Lasagna")).await;
    response.assert_status(StatusCode::UNAUTHORIZED);

    let id = create_recipe(&app.server, &token, heavy_recipe("Lasagna")).await;
    create_recipe(&app.server, &token, light_recipe("Salad", 200)).await;

    let response = app.server.get(&format!("/api/v1/recipes/{}", id)).await;
    response.assert_status_ok();
    let recipe: Value = response.json();
    assert_eq!(
        recipe["food_flags"],
        json!(["high_sodium", "high_fat", "high_calories", "high_carbs"])
    );

    let response = app.server.get("/api/v1/recipes/9999").await;
    response.assert_status(StatusCode::NOT_FOUND);

    let response = app.server.get("/api/v1/recipes?cuisine=Italian").await;
    response.assert_status_ok();
    let listed: Vec<Value> = response.json();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["title"], "Lasagna");

    let response = app.server.get("/api/v1/recipes?skip=0&limit=1").await;
    let listed: Vec<Value> = response.json();
    assert_eq!(listed.len(), 1);

    let response = bearer(app.server.post(&format!("/api/v1/recipes/{}/rate", id)), &token)
        .json(&json!({ "rating": 6 }))
        .await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);

    let response = bearer(app.server.post(&format!("/api/v1/recipes/{}/rate", id)), &token)
        .json(&json!({ "rating": 4, "comment": "Rich" }))
        .await;
    response.assert_status_ok();
    let rating: Value = response.json();
    assert_eq!(rating["rating"], 4);

    let response = bearer(
        app.server.post(&format!("/api/v1/recipes/{}/interactions", id)),
        &token,
    )
    .json(&json!({ "interaction_type": "cook" }))
    .await;
    response.assert_status(StatusCode::CREATED);
    let interaction: Value = response.json();
    assert_eq!(interaction["interaction_type"], "cook");
}

#[tokio::test]
async fn test_favorites() {
    let app = create_test_app();
    let token = register_and_login(&app.server, "cook@example.com").await;
    let id = create_recipe(&app.server, &token, light_recipe("Salad", 200)).await;

    let path = format!("/api/v1/users/me/favorites/{}", id);

    bearer(app.server.post(&path), &token).await.assert_status_ok();
    // saving twice keeps a single favorite
    bearer(app.server.post(&path), &token).await.assert_status_ok();

    let response = bearer(app.server.get("/api/v1/users/me/favorites"), &token).await;
    let favorites: Vec<Value> = response.json();
    assert_eq!(favorites.len(), 1);
    assert_eq!(favorites[0]["id"], id);

    bearer(app.server.delete(&path), &token).await.assert_status_ok();

    let response = bearer(app.server.delete(&path), &token).await;
    response.assert_status(StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert_eq!(body["error"], "Recipe not found in favorites");

    bearer(app.server.post("/api/v1/users/me/favorites/9999"), &token)
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_ingredients() {
    let app = create_test_app();
    let token = register_and_login(&app.server, "cook@example.com").await;

    let response = bearer(app.server.post("/api/v1/ingredients"), &token)
        .json(&json!({
            "name": "Peanut Butter",
            "category": "Nuts",
            "common_allergens": ["Peanuts"]
        }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let created: Value = response.json();
    assert_eq!(created["common_allergens"], json!(["peanuts"]));

    let response = bearer(app.server.post("/api/v1/ingredients"), &token)
        .json(&json!({ "name": "peanut butter" }))
        .await;
    response.assert_status(StatusCode::CONFLICT);

    let response = app
        .server
        .get("/api/v1/ingredients/search?query=PEANUT&limit=5")
        .await;
    response.assert_status_ok();
    let found: Vec<Value> = response.json();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0]["name"], "Peanut Butter");
}

#[tokio::test]
async fn test_similar_recipes() {
    let app = create_test_app();
    let token = register_and_login(&app.server, "cook@example.com").await;

    let salad = create_recipe(&app.server, &token, light_recipe("Salad", 200)).await;
    let soup = create_recipe(&app.server, &token, light_recipe("Soup", 220)).await;
    create_recipe(&app.server, &token, heavy_recipe("Lasagna")).await;

    let response = app
        .server
        .get(&format!(
            "/api/v1/recommendations/similar/{}?n_recommendations=1",
            salad
        ))
        .await;
    response.assert_status_ok();
    let similar: Vec<Value> = response.json();
    assert_eq!(similar.len(), 1);
    assert_eq!(similar[0]["id"], soup);
    assert!(similar[0]["nutritional_info"]["calories"].is_number());

    app.server
        .get("/api/v1/recommendations/similar/9999")
        .await
        .assert_status(StatusCode::NOT_FOUND);

    app.server
        .get(&format!(
            "/api/v1/recommendations/similar/{}?n_recommendations=0",
            salad
        ))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_personalized_recommendations_respect_preferences() {
    let app = create_test_app();
    let token = register_and_login(&app.server, "cook@example.com").await;

    let salad = create_recipe(&app.server, &token, light_recipe("Salad", 200)).await;
    let soup = create_recipe(&app.server, &token, light_recipe("Soup", 220)).await;
    create_recipe(&app.server, &token, heavy_recipe("Lasagna")).await;

    bearer(app.server.put("/api/v1/users/me/preferences"), &token)
        .json(&json!({ "food_flags": ["high_sodium"] }))
        .await
        .assert_status_ok();
    bearer(
        app.server.post(&format!("/api/v1/users/me/favorites/{}", salad)),
        &token,
    )
    .await
    .assert_status_ok();

    let response = bearer(app.server.get("/api/v1/recommendations/personalized"), &token).await;
    response.assert_status_ok();
    let recs: Vec<Value> = response.json();
    let ids: Vec<i64> = recs.iter().map(|r| r["id"].as_i64().unwrap()).collect();
    assert_eq!(ids, vec![soup]);

    bearer(
        app.server
            .get("/api/v1/recommendations/personalized?n_recommendations=101"),
        &token,
    )
    .await
    .assert_status(StatusCode::BAD_REQUEST);

    app.server
        .get("/api/v1/recommendations/personalized")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_train_requires_admin() {
    let app = create_test_app();
    let user_token = register_and_login(&app.server, "cook@example.com").await;
    let admin_token = register_and_login(&app.server, "admin@example.com").await;

    create_recipe(&app.server, &user_token, light_recipe("Salad", 200)).await;

    bearer(app.server.post("/api/v1/recommendations/train"), &user_token)
        .await
        .assert_status(StatusCode::FORBIDDEN);

    let response = bearer(app.server.post("/api/v1/recommendations/train"), &admin_token).await;
    response.assert_status_ok();
    let summary: Value = response.json();
    assert_eq!(summary["recipes"], 1);
    assert_eq!(summary["message"], "Model trained successfully");
}
