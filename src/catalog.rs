use chrono::Utc;
use uuid::Uuid;

use crate::error::CatalogError;
use crate::metrics::NAMING_CONFLICT_RETRIES;
use crate::models::{Recipe, RecipeDraft, RecipePatch};
use crate::slug::resolve_unique;
use crate::store::RecipeRepository;

// First try plus one retry with a freshly resolved slug
const NAMING_ATTEMPTS: usize = 2;

fn note_retry(slug: &str) {
    NAMING_CONFLICT_RETRIES.inc();
    tracing::warn!(slug = %slug, "slug claimed concurrently, re-resolving");
}

/// Persist a new recipe under a unique slug derived from its title.
pub async fn create_recipe<R>(repo: &R, draft: RecipeDraft) -> Result<Recipe, CatalogError>
where
    R: RecipeRepository,
{
    let id = Uuid::new_v4().to_string();
    let now = Utc::now();

    let mut attempt = 0;
    loop {
        let slug = resolve_unique(&draft.title, repo, None).await?;
        let recipe = Recipe::from_draft(id.clone(), slug, draft.clone(), now);
        match repo.insert(recipe).await {
            Ok(recipe) => {
                tracing::info!(id = %recipe.id, slug = %recipe.slug, "recipe created");
                return Ok(recipe);
            }
            Err(CatalogError::NamingConflict { slug }) if attempt + 1 < NAMING_ATTEMPTS => {
                note_retry(&slug);
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Apply `patch` to the recipe at `slug`.
///
/// The slug is re-derived only when the title actually changes, and the
/// record's own slug never counts as taken.
pub async fn update_recipe<R>(
    repo: &R,
    slug: &str,
    patch: RecipePatch,
) -> Result<Recipe, CatalogError>
where
    R: RecipeRepository,
{
    let existing = get_recipe(repo, slug).await?;
    let new_title = patch
        .title
        .as_deref()
        .filter(|title| *title != existing.title);
    let now = Utc::now();

    let mut attempt = 0;
    loop {
        let next_slug = match new_title {
            Some(title) => resolve_unique(title, repo, Some(&existing.id)).await?,
            None => existing.slug.clone(),
        };
        let next = existing.patched(next_slug, patch.clone(), now);
        match repo.replace(slug, next).await {
            Ok(recipe) => {
                tracing::info!(id = %recipe.id, from = %slug, to = %recipe.slug, "recipe updated");
                return Ok(recipe);
            }
            Err(CatalogError::NamingConflict { slug }) if attempt + 1 < NAMING_ATTEMPTS => {
                note_retry(&slug);
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

pub async fn get_recipe<R>(repo: &R, slug: &str) -> Result<Recipe, CatalogError>
where
    R: RecipeRepository,
{
    repo.get_by_slug(slug)
        .await?
        .ok_or_else(|| CatalogError::NotFound(slug.to_string()))
}

pub async fn delete_recipe<R>(repo: &R, slug: &str) -> Result<Recipe, CatalogError>
where
    R: RecipeRepository,
{
    let removed = repo
        .remove_by_slug(slug)
        .await?
        .ok_or_else(|| CatalogError::NotFound(slug.to_string()))?;
    tracing::info!(id = %removed.id, slug = %removed.slug, "recipe deleted");
    Ok(removed)
}
