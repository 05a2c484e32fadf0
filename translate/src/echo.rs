//! [`EchoTranslator`]: a deterministic [`TextTranslator`] with no external dependency,
//! used where a real translation backend isn't configured (local runs, integration
//! tests exercising the rest of the pipeline).

use polygo_core::{TextTranslator, TranslatorError};
use std::future::Future;
use std::pin::Pin;

/// Appends a `[lang_to]` marker to the source text instead of calling out to a
/// provider. Deterministic and infallible, so it never exercises the retry paths
/// built around [`TranslatorError`].
#[derive(Debug, Default, Clone, Copy)]
pub struct EchoTranslator;

impl TextTranslator for EchoTranslator {
    fn translate<'a>(
        &'a self,
        text: &'a str,
        _lang_from: &'a str,
        lang_to: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String, TranslatorError>> + Send + 'a>> {
        Box::pin(async move { Ok(format!("{text} [{lang_to}]")) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn appends_the_target_language_marker() {
        let translated = EchoTranslator.translate("Pasta", "it", "en").await.expect("translate");
        assert_eq!(translated, "Pasta [en]");
    }
}
