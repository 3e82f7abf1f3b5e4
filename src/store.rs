use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::future::Future;

use crate::error::CatalogError;
use crate::models::{Page, Pagination, Recipe, RecipeFilter};
use crate::slug::SlugLookup;

/// Persistence operations the catalog flows need.
///
/// Writes must enforce slug uniqueness and report a taken slug as
/// [`CatalogError::NamingConflict`].
pub trait RecipeRepository: SlugLookup {
    fn insert(&self, recipe: Recipe) -> impl Future<Output = Result<Recipe, CatalogError>> + Send;

    /// Store `recipe` in place of the record currently at `previous_slug`.
    fn replace(
        &self,
        previous_slug: &str,
        recipe: Recipe,
    ) -> impl Future<Output = Result<Recipe, CatalogError>> + Send;

    fn get_by_slug(
        &self,
        slug: &str,
    ) -> impl Future<Output = Result<Option<Recipe>, CatalogError>> + Send;

    fn remove_by_slug(
        &self,
        slug: &str,
    ) -> impl Future<Output = Result<Option<Recipe>, CatalogError>> + Send;

    fn list(
        &self,
        filter: &RecipeFilter,
        page: usize,
        page_size: usize,
    ) -> impl Future<Output = Result<Page<Recipe>, CatalogError>> + Send;
}

// In-process store: records by id plus a slug -> id index that acts as the
// unique constraint
#[derive(Default)]
pub struct MemoryStore {
    records: DashMap<String, Recipe>,
    slugs: DashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn claim_slug(&self, recipe: &Recipe) -> Result<(), CatalogError> {
        match self.slugs.entry(recipe.slug.clone()) {
            Entry::Occupied(owner) if owner.get() != &recipe.id => {
                Err(CatalogError::NamingConflict {
                    slug: recipe.slug.clone(),
                })
            }
            Entry::Occupied(_) => {
                self.records.insert(recipe.id.clone(), recipe.clone());
                Ok(())
            }
            Entry::Vacant(slot) => {
                // record goes in before the slug becomes visible
                self.records.insert(recipe.id.clone(), recipe.clone());
                slot.insert(recipe.id.clone());
                Ok(())
            }
        }
    }
}

impl SlugLookup for MemoryStore {
    async fn find_slug_owner(&self, slug: &str) -> Result<Option<String>, CatalogError> {
        Ok(self.slugs.get(slug).map(|id| id.value().clone()))
    }
}

impl RecipeRepository for MemoryStore {
    async fn insert(&self, recipe: Recipe) -> Result<Recipe, CatalogError> {
        self.claim_slug(&recipe)?;
        Ok(recipe)
    }

    async fn replace(&self, previous_slug: &str, recipe: Recipe) -> Result<Recipe, CatalogError> {
        if !self.records.contains_key(&recipe.id) {
            return Err(CatalogError::NotFound(previous_slug.to_string()));
        }
        self.claim_slug(&recipe)?;
        if recipe.slug != previous_slug {
            self.slugs.remove_if(previous_slug, |_, owner| owner == &recipe.id);
        }
        Ok(recipe)
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Recipe>, CatalogError> {
        let Some(id) = self.slugs.get(slug).map(|id| id.value().clone()) else {
            return Ok(None);
        };
        Ok(self.records.get(&id).map(|r| r.value().clone()))
    }

    async fn remove_by_slug(&self, slug: &str) -> Result<Option<Recipe>, CatalogError> {
        let Some((_, id)) = self.slugs.remove(slug) else {
            return Ok(None);
        };
        Ok(self.records.remove(&id).map(|(_, recipe)| recipe))
    }

    async fn list(
        &self,
        filter: &RecipeFilter,
        page: usize,
        page_size: usize,
    ) -> Result<Page<Recipe>, CatalogError> {
        let mut matching: Vec<Recipe> = self
            .records
            .iter()
            .filter(|r| filter.matches(r.value()))
            .map(|r| r.value().clone())
            .collect();
        // newest first
        matching.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.slug.cmp(&b.slug))
        });

        let total = matching.len();
        let data = matching
            .into_iter()
            .skip((page - 1).saturating_mul(page_size))
            .take(page_size)
            .collect();

        Ok(Page {
            data,
            pagination: Pagination::new(page, page_size, total),
        })
    }
}
