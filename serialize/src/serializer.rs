//! [`LocalizedSerializer`]: renders a [`Story`]/[`Recipe`] onto the CMS's flat,
//! language-suffixed wire shape, and reads it back for a chosen language (spec §4.3).

use crate::descriptor::{emit, read_str, FieldSpec};
use polygo_core::{Ingredient, Ingredients, Recipe, Step, Story};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use thiserror::Error;

/// Errors reading a recipe back out of its wire form.
#[derive(Debug, Error)]
pub enum SerializeError {
    /// The document is not even a JSON object.
    #[error("expected a JSON object, got something else")]
    NotAnObject,
    /// A required nested field (`content`, `ingredients`) was missing or malformed.
    #[error("missing or malformed field: {0}")]
    MalformedField(&'static str),
}

const INGREDIENT_FIELDS: [FieldSpec; 3] = [
    FieldSpec { canonical: "name", translatable: true },
    FieldSpec { canonical: "unit", translatable: true },
    FieldSpec { canonical: "quantity", translatable: false },
];

const STEP_FIELDS: [FieldSpec; 5] = [
    FieldSpec { canonical: "_uid", translatable: false },
    FieldSpec { canonical: "title", translatable: true },
    FieldSpec { canonical: "content", translatable: true },
    FieldSpec { canonical: "component", translatable: false },
    FieldSpec { canonical: "thumbnail", translatable: false },
];

const RECIPE_FIELDS: [FieldSpec; 12] = [
    FieldSpec { canonical: "_uid", translatable: false },
    FieldSpec { canonical: "title", translatable: true },
    FieldSpec { canonical: "summary", translatable: true },
    FieldSpec { canonical: "description", translatable: true },
    FieldSpec { canonical: "conclusion", translatable: true },
    FieldSpec { canonical: "extra", translatable: true },
    FieldSpec { canonical: "cost", translatable: false },
    FieldSpec { canonical: "prep", translatable: false },
    FieldSpec { canonical: "cooking", translatable: false },
    FieldSpec { canonical: "servings", translatable: false },
    FieldSpec { canonical: "difficulty", translatable: false },
    FieldSpec { canonical: "image", translatable: false },
];

/// Stateless rendering/reading of the CMS's localized wire convention.
pub struct LocalizedSerializer;

impl LocalizedSerializer {
    /// Render `story` onto its wire shape. Top-level `Story` fields are never
    /// re-suffixed (spec §4.3 "Top-level (non-`content`) Recipe fields are not
    /// re-suffixed"); only `content` and its nested records carry the marker.
    #[must_use]
    pub fn serialize_story(story: &Story) -> Value {
        let mut map = Map::new();
        map.insert("id".to_string(), Value::from(story.id));
        map.insert("uuid".to_string(), Value::from(story.uuid.clone()));
        map.insert("name".to_string(), Value::from(story.name.clone()));
        map.insert("slug".to_string(), Value::from(story.slug.clone()));
        map.insert("full_slug".to_string(), Value::from(story.full_slug.clone()));
        map.insert("path".to_string(), serde_json::to_value(&story.path).unwrap_or(Value::Null));
        map.insert("tag_list".to_string(), serde_json::to_value(&story.tag_list).unwrap_or(Value::Null));
        map.insert("created_at".to_string(), serde_json::to_value(story.created_at).unwrap_or(Value::Null));
        map.insert(
            "first_published_at".to_string(),
            serde_json::to_value(story.first_published_at).unwrap_or(Value::Null),
        );
        map.insert("published_at".to_string(), serde_json::to_value(story.published_at).unwrap_or(Value::Null));
        map.insert("alternates".to_string(), serde_json::to_value(&story.alternates).unwrap_or(Value::Null));
        map.insert("sort_by_date".to_string(), serde_json::to_value(&story.sort_by_date).unwrap_or(Value::Null));
        map.insert("meta_data".to_string(), serde_json::to_value(&story.meta_data).unwrap_or(Value::Null));
        map.insert("release_id".to_string(), serde_json::to_value(&story.release_id).unwrap_or(Value::Null));
        map.insert("group_id".to_string(), Value::from(story.group_id.clone()));
        map.insert("lang".to_string(), Value::from(story.lang.clone()));
        map.insert("content".to_string(), Self::serialize_content(&story.content));
        Value::Object(map)
    }

    /// Render `recipe` (the `content` block) using its own `lang` marker.
    #[must_use]
    pub fn serialize_content(recipe: &Recipe) -> Value {
        let lang = recipe.lang.as_str();
        let scalars = vec![
            (RECIPE_FIELDS[0].canonical, false, Value::from(recipe.uid.clone())),
            (RECIPE_FIELDS[1].canonical, true, Value::from(recipe.title.clone())),
            (RECIPE_FIELDS[2].canonical, true, Value::from(recipe.summary.clone())),
            (RECIPE_FIELDS[3].canonical, true, Value::from(recipe.description.clone())),
            (RECIPE_FIELDS[4].canonical, true, Value::from(recipe.conclusion.clone())),
            (RECIPE_FIELDS[5].canonical, true, Value::from(recipe.extra.clone())),
            (RECIPE_FIELDS[6].canonical, false, Value::from(recipe.cost.clone())),
            (RECIPE_FIELDS[7].canonical, false, Value::from(recipe.prep.clone())),
            (RECIPE_FIELDS[8].canonical, false, Value::from(recipe.cooking.clone())),
            (RECIPE_FIELDS[9].canonical, false, Value::from(recipe.servings.clone())),
            (RECIPE_FIELDS[10].canonical, false, Value::from(recipe.difficulty.clone())),
            (RECIPE_FIELDS[11].canonical, false, Value::from(recipe.image.clone())),
        ];
        let fields = scalars.into_iter().map(|(canonical, translatable, value)| {
            (FieldSpec { canonical, translatable }, value)
        }).collect();
        let mut map = emit(fields, lang);

        map.insert("component".to_string(), Value::from(recipe.component.clone()));
        map.insert("likes".to_string(), serde_json::to_value(&recipe.likes).unwrap_or(Value::Null));
        map.insert(
            "steps".to_string(),
            Value::Array(recipe.steps.iter().map(Self::serialize_step).collect()),
        );
        map.insert("ingredients".to_string(), Self::serialize_ingredients(&recipe.ingredients));
        map.insert(
            "translations".to_string(),
            serde_json::to_value(&recipe.translations).unwrap_or(Value::Null),
        );
        map.insert("translated".to_string(), Value::from(recipe.translated));
        Value::Object(map)
    }

    fn serialize_step(step: &Step) -> Value {
        let lang = step.lang.as_str();
        let fields = vec![
            (STEP_FIELDS[0].canonical, false, Value::from(step.uid.clone())),
            (STEP_FIELDS[1].canonical, true, Value::from(step.title.clone())),
            (STEP_FIELDS[2].canonical, true, Value::from(step.content.clone())),
        ];
        let fields = fields.into_iter().map(|(canonical, translatable, value)| {
            (FieldSpec { canonical, translatable }, value)
        }).collect();
        let mut map = emit(fields, lang);
        map.insert("component".to_string(), Value::from(step.component.clone()));
        map.insert("thumbnail".to_string(), Value::from(step.thumbnail.clone()));
        Value::Object(map)
    }

    fn serialize_ingredient(ingredient: &Ingredient) -> Value {
        let lang = ingredient.lang.as_str();
        let fields = vec![
            (INGREDIENT_FIELDS[0].canonical, true, Value::from(ingredient.name.clone())),
            (INGREDIENT_FIELDS[1].canonical, true, Value::from(ingredient.unit.clone())),
        ];
        let fields = fields.into_iter().map(|(canonical, translatable, value)| {
            (FieldSpec { canonical, translatable }, value)
        }).collect();
        let mut map = emit(fields, lang);
        map.insert("quantity".to_string(), Value::from(ingredient.quantity.clone()));
        Value::Object(map)
    }

    fn serialize_ingredients(ingredients: &Ingredients) -> Value {
        let mut map = Map::new();
        map.insert("_uid".to_string(), Value::from(ingredients.uid.clone()));
        map.insert("plugin".to_string(), Value::from(ingredients.plugin.clone()));
        map.insert(
            "ingredients".to_string(),
            Value::Array(ingredients.ingredients.iter().map(Self::serialize_ingredient).collect()),
        );
        Value::Object(map)
    }

    /// Read a [`Story`] back out of its wire shape, selecting language `lang`
    /// (`""` for the untranslated source) from its sibling-keyed translatable fields.
    ///
    /// # Errors
    ///
    /// Returns [`SerializeError`] if `value` is not an object or `content`/`ingredients`
    /// are missing or malformed.
    pub fn deserialize_story(value: &Value, lang: &str) -> Result<Story, SerializeError> {
        let map = value.as_object().ok_or(SerializeError::NotAnObject)?;
        let content_value = map.get("content").ok_or(SerializeError::MalformedField("content"))?;
        let content = Self::deserialize_content(content_value, lang)?;

        Ok(Story {
            id: map.get("id").and_then(Value::as_i64).unwrap_or_default(),
            uuid: map.get("uuid").and_then(Value::as_str).unwrap_or_default().to_string(),
            name: map.get("name").and_then(Value::as_str).unwrap_or_default().to_string(),
            slug: map.get("slug").and_then(Value::as_str).unwrap_or_default().to_string(),
            full_slug: map.get("full_slug").and_then(Value::as_str).unwrap_or_default().to_string(),
            path: map.get("path").and_then(|v| serde_json::from_value(v.clone()).ok()).unwrap_or_default(),
            tag_list: map.get("tag_list").and_then(|v| serde_json::from_value(v.clone()).ok()).unwrap_or_default(),
            created_at: map
                .get("created_at")
                .and_then(|v| serde_json::from_value(v.clone()).ok())
                .unwrap_or_else(chrono::Utc::now),
            first_published_at: map
                .get("first_published_at")
                .and_then(|v| serde_json::from_value(v.clone()).ok())
                .unwrap_or_else(chrono::Utc::now),
            published_at: map
                .get("published_at")
                .and_then(|v| serde_json::from_value(v.clone()).ok())
                .unwrap_or_else(chrono::Utc::now),
            alternates: map.get("alternates").and_then(|v| serde_json::from_value(v.clone()).ok()).unwrap_or_default(),
            sort_by_date: map
                .get("sort_by_date")
                .and_then(|v| serde_json::from_value(v.clone()).ok())
                .unwrap_or_default(),
            meta_data: map.get("meta_data").and_then(|v| serde_json::from_value(v.clone()).ok()).unwrap_or_default(),
            release_id: map.get("release_id").and_then(|v| serde_json::from_value(v.clone()).ok()).unwrap_or_default(),
            group_id: map.get("group_id").and_then(Value::as_str).unwrap_or_default().to_string(),
            lang: map.get("lang").and_then(Value::as_str).unwrap_or_default().to_string(),
            content,
        })
    }

    /// Read a [`Recipe`] (`content` block) back out of its wire shape for `lang`.
    ///
    /// # Errors
    ///
    /// Returns [`SerializeError::MalformedField`] if `ingredients` is missing.
    pub fn deserialize_content(value: &Value, lang: &str) -> Result<Recipe, SerializeError> {
        let map = value.as_object().ok_or(SerializeError::NotAnObject)?;

        let steps = map
            .get("steps")
            .and_then(Value::as_array)
            .map(|arr| arr.iter().map(Self::deserialize_step).collect())
            .unwrap_or_default();

        let ingredients_value = map.get("ingredients").ok_or(SerializeError::MalformedField("ingredients"))?;
        let ingredients = Self::deserialize_ingredients(ingredients_value)?;

        let translations: BTreeSet<String> = map
            .get("translations")
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_default();

        Ok(Recipe {
            uid: read_str(map, &RECIPE_FIELDS[0], lang),
            title: read_str(map, &RECIPE_FIELDS[1], lang),
            summary: read_str(map, &RECIPE_FIELDS[2], lang),
            description: read_str(map, &RECIPE_FIELDS[3], lang),
            conclusion: read_str(map, &RECIPE_FIELDS[4], lang),
            extra: read_str(map, &RECIPE_FIELDS[5], lang),
            cost: read_str(map, &RECIPE_FIELDS[6], lang),
            prep: read_str(map, &RECIPE_FIELDS[7], lang),
            cooking: read_str(map, &RECIPE_FIELDS[8], lang),
            servings: read_str(map, &RECIPE_FIELDS[9], lang),
            difficulty: read_str(map, &RECIPE_FIELDS[10], lang),
            image: read_str(map, &RECIPE_FIELDS[11], lang),
            component: map.get("component").and_then(Value::as_str).unwrap_or_default().to_string(),
            likes: map.get("likes").and_then(|v| serde_json::from_value(v.clone()).ok()).unwrap_or_default(),
            steps,
            ingredients,
            translations,
            translated: map.get("translated").and_then(Value::as_bool).unwrap_or_default(),
            lang: lang.to_string(),
        })
    }

    fn deserialize_step(value: &Value) -> Step {
        let lang = wire_marker_in(value);
        let map = value.as_object();
        let empty = Map::new();
        let map = map.unwrap_or(&empty);
        Step {
            uid: read_str(map, &STEP_FIELDS[0], &lang),
            title: read_str(map, &STEP_FIELDS[1], &lang),
            content: read_str(map, &STEP_FIELDS[2], &lang),
            component: map.get("component").and_then(Value::as_str).unwrap_or_default().to_string(),
            thumbnail: map.get("thumbnail").and_then(Value::as_str).unwrap_or_default().to_string(),
            lang,
        }
    }

    fn deserialize_ingredients(value: &Value) -> Result<Ingredients, SerializeError> {
        let map = value.as_object().ok_or(SerializeError::NotAnObject)?;
        let ingredients = map
            .get("ingredients")
            .and_then(Value::as_array)
            .map(|arr| arr.iter().map(Self::deserialize_ingredient).collect())
            .unwrap_or_default();
        Ok(Ingredients {
            uid: map.get("_uid").and_then(Value::as_str).unwrap_or_default().to_string(),
            plugin: map.get("plugin").and_then(Value::as_str).unwrap_or_default().to_string(),
            ingredients,
        })
    }

    fn deserialize_ingredient(value: &Value) -> Ingredient {
        let lang = wire_marker_in(value);
        let map = value.as_object();
        let empty = Map::new();
        let map = map.unwrap_or(&empty);
        Ingredient {
            name: read_str(map, &INGREDIENT_FIELDS[0], &lang),
            unit: read_str(map, &INGREDIENT_FIELDS[1], &lang),
            quantity: map.get("quantity").and_then(Value::as_str).unwrap_or_default().to_string(),
            lang,
        }
    }
}

/// Deserializing a nested record has no separately-carried `lang` marker on the wire
/// (it is transient, `skip_serializing`) — we recover it by noticing which suffixed
/// sibling key is actually present among the always-translatable `title`/`name` key.
/// Falls back to `""` (source language, no marker) when only the canonical key exists.
fn wire_marker_in(value: &Value) -> String {
    let Some(map) = value.as_object() else { return String::new() };
    for probe in ["title", "name"] {
        if let Some(key) = map.keys().find(|k| k.starts_with(probe) && k.len() > probe.len()) {
            return key[probe.len()..].to_string();
        }
    }
    String::new()
}
