//! [`RecipeTranslator`]: decomposes a recipe into per-field translation units, fans the
//! non-skipped ones out to the translation backend, collates the results, and
//! reassembles a translated recipe (spec §4.2).

use crate::skip::should_skip;
use polygo_core::{lang_marker, OwnerId, Recipe, TextTranslator, TranslationResult, TranslationUnit, TranslatorError};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinSet;

/// Errors [`RecipeTranslator::translate`] can surface. Any single field failure fails
/// the whole recipe (spec §4.2 "Error policy").
#[derive(Debug, Error)]
pub enum RecipeTranslateError {
    /// The translation backend rejected or failed a unit.
    #[error(transparent)]
    Backend(#[from] TranslatorError),

    /// A fan-out task panicked or was cancelled.
    #[error("translation task did not complete: {0}")]
    Join(String),
}

/// Root-content fields carrying translatable text (spec §3).
const ROOT_FIELDS: [&str; 5] = ["title", "summary", "description", "conclusion", "extra"];

/// Decomposes, fans out, and reassembles recipe translations.
///
/// Owns the translation backend and the recognized-units extension point; stateless
/// otherwise, so one instance is shared across every `TranslateStage` binding.
pub struct RecipeTranslator<T: TextTranslator + ?Sized> {
    backend: Arc<T>,
    recognized_units: HashSet<String>,
}

impl<T: TextTranslator + ?Sized + 'static> RecipeTranslator<T> {
    /// Build a translator over `backend`, skipping text matching `recognized_units` in
    /// addition to the always-skipped empty/numeric cases.
    #[must_use]
    pub fn new(backend: Arc<T>, recognized_units: HashSet<String>) -> Self {
        RecipeTranslator { backend, recognized_units }
    }

    /// Translate `recipe` from `lang_from` to `lang_to`. Input is cloned before
    /// mutation (the contract is pure with respect to the caller's recipe).
    ///
    /// `target_languages` determines whether `content.translated` flips to `true` once
    /// this translation's language joins the set already present.
    ///
    /// # Errors
    ///
    /// Returns [`RecipeTranslateError`] if any non-skipped unit fails to translate;
    /// per spec §4.2 this fails the entire recipe rather than persisting a partial
    /// translation.
    pub async fn translate(
        &self,
        recipe: &Recipe,
        recipe_id: i64,
        lang_from: &str,
        lang_to: &str,
        target_languages: &[String],
    ) -> Result<Recipe, RecipeTranslateError> {
        let mut output = recipe.clone();
        let units = decompose(recipe, recipe_id, lang_from, lang_to);

        let mut root: BTreeMap<&'static str, String> = BTreeMap::new();
        let mut steps: BTreeMap<String, BTreeMap<&'static str, String>> = BTreeMap::new();
        let mut ingredients: BTreeMap<usize, BTreeMap<&'static str, String>> = BTreeMap::new();

        let mut join_set: JoinSet<Result<TranslationResult, RecipeTranslateError>> = JoinSet::new();
        for unit in units {
            if should_skip(&unit.source_text, &self.recognized_units) {
                route(&mut root, &mut steps, &mut ingredients, pass_through(unit));
                continue;
            }
            let backend = Arc::clone(&self.backend);
            join_set.spawn(async move { run_unit(backend.as_ref(), unit).await });
        }

        while let Some(joined) = join_set.join_next().await {
            let result = match joined {
                Ok(Ok(result)) => result,
                Ok(Err(e)) => {
                    join_set.abort_all();
                    return Err(e);
                }
                Err(join_err) => {
                    join_set.abort_all();
                    return Err(RecipeTranslateError::Join(join_err.to_string()));
                }
            };
            route(&mut root, &mut steps, &mut ingredients, result);
        }

        write_back(&mut output, &root, &steps, &ingredients);

        let marker = lang_marker(lang_to);
        output.lang.clone_from(&marker);
        for step in &mut output.steps {
            step.lang.clone_from(&marker);
        }
        for ingredient in &mut output.ingredients.ingredients {
            ingredient.lang.clone_from(&marker);
        }
        output.translations.insert(lang_to.to_string());
        output.translated = output.is_translated(target_languages);

        Ok(output)
    }
}

async fn run_unit<T: TextTranslator + ?Sized>(
    backend: &T,
    unit: TranslationUnit,
) -> Result<TranslationResult, RecipeTranslateError> {
    let translated = backend.translate(&unit.source_text, &unit.lang_from, &unit.lang_to).await?;
    Ok(TranslationResult { owner_id: unit.owner_id, field_name: unit.field_name, translated })
}

fn pass_through(unit: TranslationUnit) -> TranslationResult {
    TranslationResult { owner_id: unit.owner_id, field_name: unit.field_name, translated: unit.source_text }
}

fn route(
    root: &mut BTreeMap<&'static str, String>,
    steps: &mut BTreeMap<String, BTreeMap<&'static str, String>>,
    ingredients: &mut BTreeMap<usize, BTreeMap<&'static str, String>>,
    result: TranslationResult,
) {
    match result.owner_id {
        OwnerId::Root => {
            root.insert(result.field_name, result.translated);
        }
        OwnerId::Step(uid) => {
            steps.entry(uid).or_default().insert(result.field_name, result.translated);
        }
        OwnerId::Ingredient(idx) => {
            ingredients.entry(idx).or_default().insert(result.field_name, result.translated);
        }
    }
}

/// Extract the full set of translation units for `recipe` (spec §4.2 "Decomposition").
/// Every translatable field produces a unit, skipped or not — collation needs the exact
/// count up front.
fn decompose(recipe: &Recipe, recipe_id: i64, lang_from: &str, lang_to: &str) -> Vec<TranslationUnit> {
    let mut units = Vec::new();
    let unit = |owner_id: OwnerId, field_name: &'static str, source_text: String| TranslationUnit {
        recipe_id,
        owner_id,
        field_name,
        source_text,
        lang_from: lang_from.to_string(),
        lang_to: lang_to.to_string(),
    };

    units.push(unit(OwnerId::Root, "title", recipe.title.clone()));
    units.push(unit(OwnerId::Root, "summary", recipe.summary.clone()));
    units.push(unit(OwnerId::Root, "description", recipe.description.clone()));
    units.push(unit(OwnerId::Root, "conclusion", recipe.conclusion.clone()));
    units.push(unit(OwnerId::Root, "extra", recipe.extra.clone()));

    for step in &recipe.steps {
        units.push(unit(OwnerId::Step(step.uid.clone()), "title", step.title.clone()));
        units.push(unit(OwnerId::Step(step.uid.clone()), "content", step.content.clone()));
    }

    for (idx, ingredient) in recipe.ingredients.ingredients.iter().enumerate() {
        units.push(unit(OwnerId::Ingredient(idx), "name", ingredient.name.clone()));
        units.push(unit(OwnerId::Ingredient(idx), "unit", ingredient.unit.clone()));
    }

    units
}

/// Write collated results back into `output` (spec §4.2 "Collation"): root scalars by a
/// static field-name dispatch, steps/ingredients by their staging maps, in original
/// order — shape (`uid` list, ingredient count/order) is never altered by translation.
fn write_back(
    output: &mut Recipe,
    root: &BTreeMap<&'static str, String>,
    steps: &BTreeMap<String, BTreeMap<&'static str, String>>,
    ingredients: &BTreeMap<usize, BTreeMap<&'static str, String>>,
) {
    for field in ROOT_FIELDS {
        let Some(value) = root.get(field) else { continue };
        match field {
            "title" => output.title.clone_from(value),
            "summary" => output.summary.clone_from(value),
            "description" => output.description.clone_from(value),
            "conclusion" => output.conclusion.clone_from(value),
            "extra" => output.extra.clone_from(value),
            _ => {}
        }
    }

    for step in &mut output.steps {
        let Some(fields) = steps.get(&step.uid) else { continue };
        if let Some(title) = fields.get("title") {
            step.title.clone_from(title);
        }
        if let Some(content) = fields.get("content") {
            step.content.clone_from(content);
        }
    }

    for (idx, ingredient) in output.ingredients.ingredients.iter_mut().enumerate() {
        let Some(fields) = ingredients.get(&idx) else { continue };
        if let Some(name) = fields.get("name") {
            ingredient.name.clone_from(name);
        }
        if let Some(unit_value) = fields.get("unit") {
            ingredient.unit.clone_from(unit_value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polygo_core::{Ingredient, Ingredients, Step};
    use std::collections::BTreeSet;

    struct UppercaseTranslator;

    impl TextTranslator for UppercaseTranslator {
        fn translate<'a>(
            &'a self,
            text: &'a str,
            _lang_from: &'a str,
            lang_to: &'a str,
        ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<String, TranslatorError>> + Send + 'a>>
        {
            let lang_to = lang_to.to_string();
            Box::pin(async move { Ok(format!("{}[{}]", text.to_uppercase(), lang_to)) })
        }
    }

    struct FailingTranslator;

    impl TextTranslator for FailingTranslator {
        fn translate<'a>(
            &'a self,
            _text: &'a str,
            _lang_from: &'a str,
            _lang_to: &'a str,
        ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<String, TranslatorError>> + Send + 'a>>
        {
            Box::pin(async { Err(TranslatorError::Rejected("nope".to_string())) })
        }
    }

    fn sample() -> Recipe {
        Recipe {
            uid: "r1".into(),
            title: "Tiramisù".into(),
            summary: "Dolce".into(),
            description: String::new(),
            conclusion: String::new(),
            extra: String::new(),
            cost: "10".into(),
            prep: "15".into(),
            cooking: "0".into(),
            servings: "4".into(),
            difficulty: "easy".into(),
            image: "img.png".into(),
            component: "recipe".into(),
            likes: polygo_core::Json::Null,
            steps: vec![Step {
                uid: "s1".into(),
                title: "Prep".into(),
                content: "Sbattere le uova".into(),
                component: "step".into(),
                thumbnail: String::new(),
                lang: String::new(),
            }],
            ingredients: Ingredients {
                uid: "i1".into(),
                plugin: "ingredients".into(),
                ingredients: vec![Ingredient {
                    name: "zucchero".into(),
                    unit: "gr".into(),
                    quantity: "100".into(),
                    lang: String::new(),
                }],
            },
            translations: BTreeSet::new(),
            translated: false,
            lang: String::new(),
        }
    }

    #[tokio::test]
    async fn translates_non_skipped_fields_and_preserves_shape() {
        let translator = RecipeTranslator::new(Arc::new(UppercaseTranslator), crate::skip::default_recognized_units());
        let recipe = sample();
        let targets = vec!["en".to_string()];

        let out = translator.translate(&recipe, 1, "it", "en", &targets).await.expect("translate");

        assert_eq!(out.title, "TIRAMISÙ[en]");
        assert_eq!(out.summary, "DOLCE[en]");
        assert_eq!(out.steps.len(), 1);
        assert_eq!(out.steps[0].uid, "s1");
        assert_eq!(out.steps[0].content, "SBATTERE LE UOVA[en]");
        assert_eq!(out.ingredients.ingredients.len(), 1);
        // "gr" matches the recognized-unit skip predicate: passed through unchanged.
        assert_eq!(out.ingredients.ingredients[0].unit, "gr");
        assert_eq!(out.ingredients.ingredients[0].name, "ZUCCHERO[en]");
        assert_eq!(out.cost, recipe.cost);
        assert_eq!(out.lang, "__i18n__en");
        assert_eq!(out.steps[0].lang, "__i18n__en");
        assert!(out.translations.contains("en"));
        assert!(out.translated);
    }

    #[tokio::test]
    async fn skip_predicate_bypasses_the_backend_for_numbers_and_empty_strings() {
        let translator = RecipeTranslator::new(Arc::new(UppercaseTranslator), crate::skip::default_recognized_units());
        let recipe = sample();
        let out = translator.translate(&recipe, 1, "it", "en", &[]).await.expect("translate");
        assert_eq!(out.description, "");
        assert_eq!(out.conclusion, "");
    }

    #[tokio::test]
    async fn one_failed_unit_fails_the_whole_recipe() {
        let translator = RecipeTranslator::new(Arc::new(FailingTranslator), crate::skip::default_recognized_units());
        let recipe = sample();
        let result = translator.translate(&recipe, 1, "it", "en", &[]).await;
        assert!(result.is_err());
    }
}
