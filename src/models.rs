use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::body::normalize;
use crate::error::{CatalogError, FieldError};

pub const TITLE_MAX: usize = 200;
pub const LEAD_MAX: usize = 500;
pub const DEFAULT_PAGE_SIZE: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MealGroup {
    MainDish,
    Dessert,
    Bread,
    Appetizer,
    Soup,
    Salad,
    Drink,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PrepMethod {
    Baking,
    Cooking,
    Frying,
    Grilling,
    Raw,
    Steaming,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ingredient {
    pub name: String,
    // may be empty, e.g. salt "to taste"
    #[serde(default)]
    pub quantity: String,
    #[serde(default)]
    pub unit: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub order: i64,
    pub instruction: String,
}

// Stored catalog record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    pub id: String,
    pub slug: String,
    pub title: String,
    pub lead: String,
    pub image_id: String,
    pub prep_time: u32,
    pub servings: u32,
    pub difficulty: Difficulty,
    pub meal_group: MealGroup,
    pub prep_method: PrepMethod,
    pub tags: Vec<String>,
    pub ingredients: Vec<Ingredient>,
    pub steps: Vec<Step>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Create request, after body normalization
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeDraft {
    pub title: String,
    pub lead: String,
    pub image_id: String,
    pub prep_time: i64,
    pub servings: i64,
    pub difficulty: Difficulty,
    pub meal_group: MealGroup,
    pub prep_method: PrepMethod,
    #[serde(default)]
    pub tags: Vec<String>,
    pub ingredients: Vec<Ingredient>,
    pub steps: Vec<Step>,
}

// Update request - every field optional
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipePatch {
    pub title: Option<String>,
    pub lead: Option<String>,
    pub image_id: Option<String>,
    pub prep_time: Option<i64>,
    pub servings: Option<i64>,
    pub difficulty: Option<Difficulty>,
    pub meal_group: Option<MealGroup>,
    pub prep_method: Option<PrepMethod>,
    pub tags: Option<Vec<String>>,
    pub ingredients: Option<Vec<Ingredient>>,
    pub steps: Option<Vec<Step>>,
}

fn parse_body<T: serde::de::DeserializeOwned>(body: Value) -> Result<T, CatalogError> {
    let body = normalize(body)?;
    serde_json::from_value(body).map_err(|e| CatalogError::validation("body", e.to_string()))
}

fn check_text(errors: &mut Vec<FieldError>, field: &str, value: &str, max: Option<usize>) {
    let len = value.chars().count();
    if len == 0 {
        errors.push(FieldError::new(field, "is required"));
    } else if let Some(max) = max.filter(|max| len > *max) {
        errors.push(FieldError::new(field, format!("must be at most {max} characters")));
    }
}

fn check_positive(errors: &mut Vec<FieldError>, field: &str, value: i64) {
    if value <= 0 || value > i64::from(u32::MAX) {
        errors.push(FieldError::new(field, "must be a positive number"));
    }
}

fn check_ingredients(errors: &mut Vec<FieldError>, ingredients: &[Ingredient]) {
    if ingredients.is_empty() {
        errors.push(FieldError::new("ingredients", "at least one ingredient is required"));
    }
    for (i, ingredient) in ingredients.iter().enumerate() {
        check_text(errors, &format!("ingredients[{i}].name"), &ingredient.name, None);
    }
}

fn check_steps(errors: &mut Vec<FieldError>, steps: &[Step]) {
    if steps.is_empty() {
        errors.push(FieldError::new("steps", "at least one step is required"));
    }
    for (i, step) in steps.iter().enumerate() {
        if step.order <= 0 {
            errors.push(FieldError::new(format!("steps[{i}].order"), "must be a positive number"));
        }
        check_text(errors, &format!("steps[{i}].instruction"), &step.instruction, None);
    }
}

fn finish(errors: Vec<FieldError>) -> Result<(), CatalogError> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(CatalogError::Validation(errors))
    }
}

impl RecipeDraft {
    /// Normalize, deserialize and validate a create request body.
    pub fn from_body(body: Value) -> Result<Self, CatalogError> {
        let draft: Self = parse_body(body)?;
        draft.validate()?;
        Ok(draft)
    }

    pub fn validate(&self) -> Result<(), CatalogError> {
        let mut errors = Vec::new();
        check_text(&mut errors, "title", &self.title, Some(TITLE_MAX));
        check_text(&mut errors, "lead", &self.lead, Some(LEAD_MAX));
        check_text(&mut errors, "imageId", &self.image_id, None);
        check_positive(&mut errors, "prepTime", self.prep_time);
        check_positive(&mut errors, "servings", self.servings);
        check_ingredients(&mut errors, &self.ingredients);
        check_steps(&mut errors, &self.steps);
        finish(errors)
    }
}

impl RecipePatch {
    pub fn from_body(body: Value) -> Result<Self, CatalogError> {
        let patch: Self = parse_body(body)?;
        patch.validate()?;
        Ok(patch)
    }

    pub fn validate(&self) -> Result<(), CatalogError> {
        let mut errors = Vec::new();
        if let Some(title) = &self.title {
            check_text(&mut errors, "title", title, Some(TITLE_MAX));
        }
        if let Some(lead) = &self.lead {
            check_text(&mut errors, "lead", lead, Some(LEAD_MAX));
        }
        if let Some(image_id) = &self.image_id {
            check_text(&mut errors, "imageId", image_id, None);
        }
        if let Some(prep_time) = self.prep_time {
            check_positive(&mut errors, "prepTime", prep_time);
        }
        if let Some(servings) = self.servings {
            check_positive(&mut errors, "servings", servings);
        }
        if let Some(ingredients) = &self.ingredients {
            check_ingredients(&mut errors, ingredients);
        }
        if let Some(steps) = &self.steps {
            check_steps(&mut errors, steps);
        }
        finish(errors)
    }
}

impl Recipe {
    // Values are validated, so the u32 conversions cannot truncate
    pub fn from_draft(id: String, slug: String, draft: RecipeDraft, now: DateTime<Utc>) -> Self {
        Self {
            id,
            slug,
            title: draft.title,
            lead: draft.lead,
            image_id: draft.image_id,
            prep_time: draft.prep_time as u32,
            servings: draft.servings as u32,
            difficulty: draft.difficulty,
            meal_group: draft.meal_group,
            prep_method: draft.prep_method,
            tags: draft.tags,
            ingredients: draft.ingredients,
            steps: draft.steps,
            created_at: now,
            updated_at: now,
        }
    }

    /// Copy of `self` with every supplied patch field applied.
    pub fn patched(&self, slug: String, patch: RecipePatch, now: DateTime<Utc>) -> Self {
        let mut next = self.clone();
        next.slug = slug;
        next.updated_at = now;

        if let Some(v) = patch.title {
            next.title = v;
        }
        if let Some(v) = patch.lead {
            next.lead = v;
        }
        if let Some(v) = patch.image_id {
            next.image_id = v;
        }
        if let Some(v) = patch.prep_time {
            next.prep_time = v as u32;
        }
        if let Some(v) = patch.servings {
            next.servings = v as u32;
        }
        if let Some(v) = patch.difficulty {
            next.difficulty = v;
        }
        if let Some(v) = patch.meal_group {
            next.meal_group = v;
        }
        if let Some(v) = patch.prep_method {
            next.prep_method = v;
        }
        if let Some(v) = patch.tags {
            next.tags = v;
        }
        if let Some(v) = patch.ingredients {
            next.ingredients = v;
        }
        if let Some(v) = patch.steps {
            next.steps = v;
        }
        next
    }
}

// Query string for the list endpoint
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub difficulty: Option<Difficulty>,
    pub meal_group: Option<MealGroup>,
    pub search: Option<String>,
    pub page: Option<usize>,
    pub page_size: Option<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct RecipeFilter {
    pub difficulty: Option<Difficulty>,
    pub meal_group: Option<MealGroup>,
    pub search: Option<String>,
}

impl RecipeFilter {
    pub fn matches(&self, recipe: &Recipe) -> bool {
        if self.difficulty.is_some_and(|d| d != recipe.difficulty) {
            return false;
        }
        if self.meal_group.is_some_and(|g| g != recipe.meal_group) {
            return false;
        }
        match self.search.as_deref().map(str::trim) {
            Some(term) if !term.is_empty() => {
                recipe.title.to_lowercase().contains(&term.to_lowercase())
            }
            _ => true,
        }
    }
}

impl ListQuery {
    pub fn filter(&self) -> RecipeFilter {
        RecipeFilter {
            difficulty: self.difficulty,
            meal_group: self.meal_group,
            search: self.search.clone(),
        }
    }

    // Page numbers start at 1
    pub fn page(&self) -> usize {
        self.page.unwrap_or(1).max(1)
    }

    pub fn page_size(&self) -> usize {
        self.page_size.unwrap_or(DEFAULT_PAGE_SIZE).max(1)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: usize,
    pub page_size: usize,
    pub total: usize,
    pub total_pages: usize,
    pub has_next: bool,
    pub has_prev: bool,
}

impl Pagination {
    pub fn new(page: usize, page_size: usize, total: usize) -> Self {
        let total_pages = total.div_ceil(page_size);
        Self {
            page,
            page_size,
            total,
            total_pages,
            has_next: page < total_pages,
            has_prev: page > 1,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub pagination: Pagination,
}
