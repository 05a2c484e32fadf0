//! The `CmsClient` collaborator contract (spec §4.5): a thin, typed-error surface over
//! the headless CMS's REST API. The core treats this purely as a capability; the HTTP
//! implementation lives in `polygo-cms`.

use crate::recipe::Story;
use std::collections::BTreeSet;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Errors a [`CmsClient`] implementation can surface.
#[derive(Error, Debug, Clone)]
pub enum CmsError {
    /// Network failure or 5xx: safe to retry.
    #[error("CMS transient error: {0}")]
    Transient(String),

    /// Authentication/authorization failure (expired token, insufficient scope).
    #[error("CMS auth error: {0}")]
    Auth(String),

    /// The requested resource does not exist.
    #[error("CMS resource not found: {0}")]
    NotFound(String),

    /// The CMS rejected the request due to a conflicting write.
    #[error("CMS conflict: {0}")]
    Conflict(String),
}

impl CmsError {
    /// Whether this error is worth retrying (spec §7: "CMS transient errors ... retried
    /// by PersistStage up to a small bound").
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, CmsError::Transient(_))
    }
}

/// The CMS operations the pipeline's core needs.
pub trait CmsClient: Send + Sync {
    /// List recipes not yet translated into every target language.
    fn list_untranslated<'a>(
        &'a self,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Story>, CmsError>> + Send + 'a>>;

    /// Fetch a single recipe by id.
    fn fetch<'a>(
        &'a self,
        id: i64,
    ) -> Pin<Box<dyn Future<Output = Result<Story, CmsError>> + Send + 'a>>;

    /// Fetch the set of language codes already present for a recipe id.
    fn languages_present<'a>(
        &'a self,
        id: i64,
    ) -> Pin<Box<dyn Future<Output = Result<BTreeSet<String>, CmsError>> + Send + 'a>>;

    /// Upsert (create-or-update-and-publish) a recipe.
    fn save<'a>(
        &'a self,
        story: &'a Story,
    ) -> Pin<Box<dyn Future<Output = Result<(), CmsError>> + Send + 'a>>;
}
