//! TranslateStage (spec §4.4): one binding per language-pair hop. Reads a document,
//! runs [`RecipeTranslator`] over its `content` block, and hands the reassembled
//! document back to [`StreamConsumer`](polygo_streams::StreamConsumer) for
//! ack-and-forward.

use polygo_core::TextTranslator;
use polygo_serialize::LocalizedSerializer;
use polygo_streams::{HandlerOutcome, StageHandler};
use polygo_translate::RecipeTranslator;
use std::future::Future;
use std::pin::Pin;

/// Translates the `content` block of every message it handles from `lang_from` to
/// `lang_to`, forwarding the reassembled document.
pub struct TranslateStage<T: TextTranslator + ?Sized> {
    translator: RecipeTranslator<T>,
    lang_from: String,
    lang_to: String,
    /// The wire language marker the incoming document's `content` carries: `""` for
    /// the untranslated source (read from `recipes.new`), `lang_marker(lang_from)` for
    /// a chained hop (read from `recipes.translated.<lang_from>`).
    incoming_marker: String,
    target_languages: Vec<String>,
}

impl<T: TextTranslator + ?Sized> TranslateStage<T> {
    /// Build a stage translating `lang_from` → `lang_to`. `incoming_marker` tells the
    /// stage which suffix convention the upstream document already uses.
    #[must_use]
    pub fn new(
        translator: RecipeTranslator<T>,
        lang_from: impl Into<String>,
        lang_to: impl Into<String>,
        incoming_marker: impl Into<String>,
        target_languages: Vec<String>,
    ) -> Self {
        TranslateStage {
            translator,
            lang_from: lang_from.into(),
            lang_to: lang_to.into(),
            incoming_marker: incoming_marker.into(),
            target_languages,
        }
    }
}

impl<T: TextTranslator + ?Sized + 'static> StageHandler for TranslateStage<T> {
    fn handle<'a>(
        &'a self,
        message: &'a polygo_core::StreamMessage,
    ) -> Pin<Box<dyn Future<Output = Result<HandlerOutcome, String>> + Send + 'a>> {
        Box::pin(async move {
            let text = message.story_text().ok_or_else(|| "message missing the story field".to_string())?;
            let raw: serde_json::Value = serde_json::from_str(text).map_err(|e| e.to_string())?;
            let mut story = LocalizedSerializer::deserialize_story(&raw, &self.incoming_marker)
                .map_err(|e| e.to_string())?;

            let translated = self
                .translator
                .translate(&story.content, story.id, &self.lang_from, &self.lang_to, &self.target_languages)
                .await
                .map_err(|e| e.to_string())?;
            story.content = translated;

            let wire = LocalizedSerializer::serialize_story(&story);
            let json = serde_json::to_string(&wire).map_err(|e| e.to_string())?;
            Ok(HandlerOutcome::Forward(polygo_core::StreamMessage::with_story_json(json)))
        })
    }
}
