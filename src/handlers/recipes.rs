use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use serde_json::{Value, json};

use crate::catalog;
use crate::client::client_key;
use crate::error::{CatalogError, RATE_LIMIT_LIMIT, RATE_LIMIT_REMAINING};
use crate::metrics::{RATE_LIMITED_TOTAL, REQUEST_TOTAL};
use crate::models::{ListQuery, RecipeDraft, RecipePatch};
use crate::rate_limit::{RateLimitDecision, RatePolicy};
use crate::state::AppState;
use crate::store::RecipeRepository;

// Admission check, run before anything touches the store
fn admit(
    state: &AppState,
    policy: &RatePolicy,
    headers: &HeaderMap,
) -> Result<RateLimitDecision, CatalogError> {
    let client = client_key(headers);
    REQUEST_TOTAL.with_label_values(&[policy.bucket.as_str()]).inc();

    let decision = state.limiter.check_policy(policy, &client);
    if !decision.allowed {
        RATE_LIMITED_TOTAL
            .with_label_values(&[policy.bucket.as_str()])
            .inc();
        tracing::warn!(bucket = %policy.bucket, client = %client, "request rejected by rate limit");
        return Err(CatalogError::QuotaExceeded(decision));
    }
    Ok(decision)
}

pub async fn list_recipes_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, CatalogError> {
    let decision = admit(&state, &state.policies.list, &headers)?;

    let page = state
        .store
        .list(&query.filter(), query.page(), query.page_size())
        .await?;

    let quota = [
        (RATE_LIMIT_LIMIT, decision.limit.to_string()),
        (RATE_LIMIT_REMAINING, decision.remaining.to_string()),
    ];
    Ok((quota, Json(page)))
}

pub async fn get_recipe_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, CatalogError> {
    admit(&state, &state.policies.get, &headers)?;
    let recipe = catalog::get_recipe(state.store.as_ref(), &slug).await?;
    Ok(Json(recipe))
}

pub async fn create_recipe_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, CatalogError> {
    admit(&state, &state.policies.create, &headers)?;

    let Json(body) = body?;
    let draft = RecipeDraft::from_body(body)?;
    let recipe = catalog::create_recipe(state.store.as_ref(), draft).await?;
    Ok((StatusCode::CREATED, Json(recipe)))
}

pub async fn update_recipe_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(slug): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, CatalogError> {
    admit(&state, &state.policies.update, &headers)?;

    let Json(body) = body?;
    let patch = RecipePatch::from_body(body)?;
    let recipe = catalog::update_recipe(state.store.as_ref(), &slug, patch).await?;
    Ok(Json(recipe))
}

pub async fn delete_recipe_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, CatalogError> {
    admit(&state, &state.policies.delete, &headers)?;

    catalog::delete_recipe(state.store.as_ref(), &slug).await?;
    Ok(Json(json!({ "message": "Recipe deleted" })))
}
