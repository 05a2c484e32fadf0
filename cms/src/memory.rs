//! An in-memory [`CmsClient`] test double, used by `polygo-stages`' stage tests so they
//! don't need a live Storyblok space.

use polygo_core::{CmsClient, CmsError, Story};
use std::collections::BTreeSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;

/// A [`CmsClient`] backed by an in-process `Vec<Story>`, guarded by a `Mutex` since the
/// trait requires `Sync`.
#[derive(Default)]
pub struct InMemoryCmsClient {
    stories: Mutex<Vec<Story>>,
}

impl InMemoryCmsClient {
    /// Seed the store with `stories`.
    #[must_use]
    pub fn seeded(stories: Vec<Story>) -> Self {
        InMemoryCmsClient { stories: Mutex::new(stories) }
    }
}

impl CmsClient for InMemoryCmsClient {
    fn list_untranslated<'a>(
        &'a self,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Story>, CmsError>> + Send + 'a>> {
        Box::pin(async move {
            let guard = self.stories.lock().map_err(|_| CmsError::Transient("poisoned store".to_string()))?;
            Ok(guard.iter().filter(|s| !s.content.translated).cloned().collect())
        })
    }

    fn fetch<'a>(&'a self, id: i64) -> Pin<Box<dyn Future<Output = Result<Story, CmsError>> + Send + 'a>> {
        Box::pin(async move {
            let guard = self.stories.lock().map_err(|_| CmsError::Transient("poisoned store".to_string()))?;
            guard.iter().find(|s| s.id == id).cloned().ok_or_else(|| CmsError::NotFound(id.to_string()))
        })
    }

    fn languages_present<'a>(
        &'a self,
        id: i64,
    ) -> Pin<Box<dyn Future<Output = Result<BTreeSet<String>, CmsError>> + Send + 'a>> {
        Box::pin(async move {
            let guard = self.stories.lock().map_err(|_| CmsError::Transient("poisoned store".to_string()))?;
            let story = guard.iter().find(|s| s.id == id).ok_or_else(|| CmsError::NotFound(id.to_string()))?;
            Ok(story.content.translations.clone())
        })
    }

    fn save<'a>(&'a self, story: &'a Story) -> Pin<Box<dyn Future<Output = Result<(), CmsError>> + Send + 'a>> {
        Box::pin(async move {
            let mut guard = self.stories.lock().map_err(|_| CmsError::Transient("poisoned store".to_string()))?;
            if let Some(existing) = guard.iter_mut().find(|s| s.id == story.id) {
                *existing = story.clone();
            } else {
                guard.push(story.clone());
            }
            Ok(())
        })
    }
}
