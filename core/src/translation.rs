//! Per-field translation work items exchanged between `RecipeTranslator` and the
//! translation backend. Lifetime is scoped to a single recipe's translation run; these
//! are never persisted.

use serde::{Deserialize, Serialize};

/// Identifies the sub-record a translation unit belongs to.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum OwnerId {
    /// The recipe's root `content` block.
    Root,
    /// A step, identified by its stable `uid`.
    Step(String),
    /// An ingredient, identified by its positional index.
    Ingredient(usize),
}

/// One translatable field extracted from a recipe.
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationUnit {
    /// The owning recipe's id.
    pub recipe_id: i64,
    /// The enclosing sub-record.
    pub owner_id: OwnerId,
    /// The field name within that sub-record (e.g. `"title"`).
    pub field_name: &'static str,
    /// The source text to translate (or pass through, if it matches the skip
    /// predicate).
    pub source_text: String,
    /// Source language code.
    pub lang_from: String,
    /// Target language code.
    pub lang_to: String,
}

/// The outcome of translating (or passing through) one [`TranslationUnit`].
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationResult {
    /// The enclosing sub-record, matching the originating unit's `owner_id`.
    pub owner_id: OwnerId,
    /// The field name, matching the originating unit's `field_name`.
    pub field_name: &'static str,
    /// The translated (or passed-through) text.
    pub translated: String,
}
