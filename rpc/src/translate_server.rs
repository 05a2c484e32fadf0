//! `Translate.Translate` RPC method (spec "RPC edge"): a synchronous escape hatch that
//! runs [`RecipeTranslator`] on one story without going through the broker, grounded on
//! original_source `translator/translator/translator.go`'s `Translator.Translate`
//! method (commented out in `server/poly.go`'s client, reinstated here as the actual
//! server side).

use crate::codec::RpcService;
use polygo_core::TextTranslator;
use polygo_serialize::LocalizedSerializer;
use polygo_translate::RecipeTranslator;
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;

/// Exposes [`RecipeTranslator`] as the single RPC method `Translate.Translate`. Unlike
/// [`crate::ingest_server::IngestService`] this never touches the broker: the caller
/// passes a story, gets a translated story back, no message is ever queued.
pub struct TranslateService<T: TextTranslator + ?Sized> {
    translator: RecipeTranslator<T>,
    lang_from: String,
    lang_to: String,
    incoming_marker: String,
    target_languages: Vec<String>,
}

impl<T: TextTranslator + ?Sized> TranslateService<T> {
    /// Build a service translating `lang_from` → `lang_to`. `incoming_marker` selects
    /// which suffix convention the request's `story.content` uses (`""` for the raw
    /// untranslated source).
    #[must_use]
    pub fn new(
        translator: RecipeTranslator<T>,
        lang_from: impl Into<String>,
        lang_to: impl Into<String>,
        incoming_marker: impl Into<String>,
        target_languages: Vec<String>,
    ) -> Self {
        TranslateService {
            translator,
            lang_from: lang_from.into(),
            lang_to: lang_to.into(),
            incoming_marker: incoming_marker.into(),
            target_languages,
        }
    }
}

impl<T: TextTranslator + ?Sized + 'static> RpcService for TranslateService<T> {
    fn call<'a>(
        &'a self,
        method: &'a str,
        mut params: Vec<Value>,
    ) -> Pin<Box<dyn Future<Output = Result<Value, String>> + Send + 'a>> {
        Box::pin(async move {
            if method != "Translate.Translate" {
                return Err(format!("unknown method: {method}"));
            }
            let request = params.pop().ok_or_else(|| "missing request argument".to_string())?;
            let story_value =
                request.get("story").cloned().ok_or_else(|| "request missing \"story\"".to_string())?;
            let mut story = LocalizedSerializer::deserialize_story(&story_value, &self.incoming_marker)
                .map_err(|e| e.to_string())?;

            let translated = self
                .translator
                .translate(&story.content, story.id, &self.lang_from, &self.lang_to, &self.target_languages)
                .await
                .map_err(|e| e.to_string())?;
            story.content = translated;

            let wire = LocalizedSerializer::serialize_story(&story);
            Ok(serde_json::json!({ "translation": wire }))
        })
    }
}
