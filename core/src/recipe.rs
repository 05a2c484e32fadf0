//! The recipe document and its envelope.
//!
//! Shapes follow `pkg/types/story.go` in the original implementation, restated as
//! plain serde-derived structs instead of reflection-driven ones: `content.lang` is a
//! transient marker consumed only by the serializer (never emitted under that name),
//! and `translations`/`translated` are the only fields a translation run mutates besides
//! the translatable scalars themselves.

use crate::json::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Language marker prefix used on the wire (`__i18n__en`, `__i18n__fr`, ...).
pub const LANG_MARKER_PREFIX: &str = "__i18n__";

/// Build the wire-form language marker for a language code.
#[must_use]
pub fn lang_marker(code: &str) -> String {
    format!("{LANG_MARKER_PREFIX}{code}")
}

/// Top-level CMS document wrapping a [`Recipe`].
///
/// Fields beyond `id`/`uuid`/`content` are CMS bookkeeping the pipeline round-trips
/// without interpreting; the heterogeneous ones are held as [`Json`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Story {
    /// Stable numeric id, unchanged across translations of the same recipe.
    pub id: i64,
    /// Stable UUID, unchanged across translations of the same recipe.
    pub uuid: String,
    /// CMS display name.
    #[serde(default)]
    pub name: String,
    /// URL slug.
    #[serde(default)]
    pub slug: String,
    /// Full (nested) slug.
    #[serde(default)]
    pub full_slug: String,
    /// CMS path; heterogeneous, round-tripped only.
    #[serde(default)]
    pub path: Json,
    /// Tags attached to the document.
    #[serde(default)]
    pub tag_list: Vec<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// First-publish timestamp.
    #[serde(default = "Utc::now")]
    pub first_published_at: DateTime<Utc>,
    /// Most recent publish timestamp.
    #[serde(default = "Utc::now")]
    pub published_at: DateTime<Utc>,
    /// Alternates list; heterogeneous, round-tripped only.
    #[serde(default)]
    pub alternates: Json,
    /// Sort-by-date field; heterogeneous, round-tripped only.
    #[serde(default)]
    pub sort_by_date: Json,
    /// Arbitrary CMS metadata; heterogeneous, round-tripped only.
    #[serde(default)]
    pub meta_data: Json,
    /// Release id; heterogeneous, round-tripped only.
    #[serde(default)]
    pub release_id: Json,
    /// CMS group id.
    #[serde(default)]
    pub group_id: String,
    /// Top-level CMS locale code (distinct from `content.lang`).
    #[serde(default)]
    pub lang: String,
    /// The translatable recipe body.
    pub content: Recipe,
}

/// The translatable recipe body nested under `content` in the CMS document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    /// CMS internal uid for this content block. Non-translatable.
    #[serde(rename = "_uid")]
    pub uid: String,
    /// Translatable.
    #[serde(default)]
    pub title: String,
    /// Translatable.
    #[serde(default)]
    pub summary: String,
    /// Translatable.
    #[serde(default)]
    pub description: String,
    /// Translatable.
    #[serde(default)]
    pub conclusion: String,
    /// Translatable.
    #[serde(default)]
    pub extra: String,
    /// Non-translatable.
    #[serde(default)]
    pub cost: String,
    /// Non-translatable.
    #[serde(default)]
    pub prep: String,
    /// Non-translatable.
    #[serde(default)]
    pub cooking: String,
    /// Non-translatable.
    #[serde(default)]
    pub servings: String,
    /// Non-translatable.
    #[serde(default)]
    pub difficulty: String,
    /// Non-translatable.
    #[serde(default)]
    pub image: String,
    /// Non-translatable; names the CMS component (e.g. "recipe").
    #[serde(default)]
    pub component: String,
    /// Non-translatable; heterogeneous, round-tripped only.
    #[serde(default)]
    pub likes: Json,
    /// Ordered steps; shape preserved by translation.
    #[serde(default)]
    pub steps: Vec<Step>,
    /// Nested ingredients block.
    pub ingredients: Ingredients,
    /// Language codes already produced for this recipe.
    #[serde(default)]
    pub translations: BTreeSet<String>,
    /// Derived flag: `translations` covers every configured target language.
    #[serde(default)]
    pub translated: bool,
    /// Transient marker set only at serialization/translation time, never persisted
    /// under this name. Empty string means "source language, no marker yet".
    #[serde(default, skip_serializing)]
    pub lang: String,
}

/// The nested ingredients block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ingredients {
    /// CMS internal uid for this block. Non-translatable.
    #[serde(rename = "_uid", default)]
    pub uid: String,
    /// CMS plugin identifier. Non-translatable.
    #[serde(default)]
    pub plugin: String,
    /// Ordered ingredient list; order preserved by translation.
    #[serde(default)]
    pub ingredients: Vec<Ingredient>,
}

/// A single recipe step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    /// Stable identifier; used as the translation-unit owner key and must survive
    /// translation unchanged.
    #[serde(rename = "_uid")]
    pub uid: String,
    /// Translatable.
    #[serde(default)]
    pub title: String,
    /// Translatable.
    #[serde(default)]
    pub content: String,
    /// Non-translatable.
    #[serde(default)]
    pub component: String,
    /// Non-translatable.
    #[serde(default)]
    pub thumbnail: String,
    /// Transient marker, see [`Recipe::lang`].
    #[serde(default, skip_serializing)]
    pub lang: String,
}

/// A single recipe ingredient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    /// Translatable.
    #[serde(default)]
    pub name: String,
    /// Translatable; units from the recognized closed set are skipped (see
    /// `polygo-translate`'s skip predicate), so this field is translated only when
    /// the source text isn't a recognized unit token.
    #[serde(default)]
    pub unit: String,
    /// Numeric-as-string quantity. Non-translatable (always numeric or skipped).
    #[serde(default)]
    pub quantity: String,
    /// Transient marker, see [`Recipe::lang`].
    #[serde(default, skip_serializing)]
    pub lang: String,
}

impl Recipe {
    /// `true` once `translations` covers every language in `target_languages`.
    #[must_use]
    pub fn is_translated(&self, target_languages: &[String]) -> bool {
        target_languages.iter().all(|lang| self.translations.contains(lang))
    }
}
