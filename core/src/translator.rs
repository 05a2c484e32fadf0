//! The `TextTranslator` capability: the one thing `RecipeTranslator` needs from a
//! translation-provider SDK. Abstracted per spec §1 ("the specific translation-provider
//! SDK (abstracted as a `TextTranslator` capability)").

use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Errors a [`TextTranslator`] implementation can surface.
#[derive(Error, Debug, Clone)]
pub enum TranslatorError {
    /// Transient failure (timeout, rate limit, 5xx) — safe to retry at a higher level.
    #[error("translation backend transient failure: {0}")]
    Transient(String),

    /// Non-retryable failure (bad request, unsupported language pair, auth failure).
    #[error("translation backend rejected the request: {0}")]
    Rejected(String),
}

/// A capability for translating a single piece of text between two language codes.
///
/// # Dyn Compatibility
///
/// Uses `Pin<Box<dyn Future>>` instead of `async fn` so implementations can be shared
/// as `Arc<dyn TextTranslator>` across every in-flight translation task.
pub trait TextTranslator: Send + Sync {
    /// Translate `text` from `lang_from` to `lang_to`.
    ///
    /// # Errors
    ///
    /// Returns [`TranslatorError::Transient`] for retryable failures and
    /// [`TranslatorError::Rejected`] otherwise. Callers (per spec §4.2 "Error policy")
    /// treat either as fatal to the enclosing recipe's translation run.
    fn translate<'a>(
        &'a self,
        text: &'a str,
        lang_from: &'a str,
        lang_to: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String, TranslatorError>> + Send + 'a>>;
}
