//! PersistStage (spec §4.4): the terminal consumer. Writes a translated document back
//! to the CMS, rate-limited and retried, then always acks (spec §7: a permanent CMS
//! rejection is logged and dropped rather than left to loop forever).

use crate::retry::retry_transient;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use polygo_core::{lang_marker, CmsClient, StreamMessage};
use polygo_serialize::LocalizedSerializer;
use polygo_streams::{HandlerOutcome, StageHandler};
use std::future::Future;
use std::num::NonZeroU32;
use std::pin::Pin;
use std::sync::Arc;

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Writes documents translated into `lang` back to the CMS.
pub struct PersistStage {
    cms: Arc<dyn CmsClient>,
    lang: String,
    retry_bound: u32,
    limiter: DirectRateLimiter,
}

impl PersistStage {
    /// Build a persist stage for `lang`, retrying transient CMS errors up to
    /// `retry_bound` times and capping outbound writes at `rate_limit_per_sec`.
    #[must_use]
    pub fn new(cms: Arc<dyn CmsClient>, lang: impl Into<String>, retry_bound: u32, rate_limit_per_sec: u32) -> Self {
        let quota = Quota::per_second(NonZeroU32::new(rate_limit_per_sec).unwrap_or(NonZeroU32::MIN));
        PersistStage { cms, lang: lang.into(), retry_bound, limiter: RateLimiter::direct(quota) }
    }
}

impl StageHandler for PersistStage {
    fn handle<'a>(
        &'a self,
        message: &'a StreamMessage,
    ) -> Pin<Box<dyn Future<Output = Result<HandlerOutcome, String>> + Send + 'a>> {
        Box::pin(async move {
            let text = message.story_text().ok_or_else(|| "message missing the story field".to_string())?;
            let raw: serde_json::Value = serde_json::from_str(text).map_err(|e| e.to_string())?;
            let marker = lang_marker(&self.lang);
            let story = LocalizedSerializer::deserialize_story(&raw, &marker).map_err(|e| e.to_string())?;

            let already = retry_transient(self.retry_bound, || self.cms.languages_present(story.id))
                .await
                .map_err(|e| e.to_string())?;
            if already.contains(&self.lang) {
                return Ok(HandlerOutcome::Drop);
            }

            self.limiter.until_ready().await;

            match retry_transient(self.retry_bound, || self.cms.save(&story)).await {
                Ok(()) => Ok(HandlerOutcome::Drop),
                Err(e) if e.is_transient() => Err(e.to_string()),
                Err(e) => {
                    tracing::error!(recipe_id = story.id, lang = %self.lang, error = %e, "permanent CMS error, dropping message");
                    Ok(HandlerOutcome::Drop)
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polygo_cms::InMemoryCmsClient;
    use polygo_core::{Ingredients, Recipe, Story};
    use std::collections::BTreeSet;

    fn story(id: i64) -> Story {
        Story {
            id,
            uuid: format!("u{id}"),
            name: String::new(),
            slug: String::new(),
            full_slug: String::new(),
            path: polygo_core::Json::Null,
            tag_list: Vec::new(),
            created_at: chrono::Utc::now(),
            first_published_at: chrono::Utc::now(),
            published_at: chrono::Utc::now(),
            alternates: polygo_core::Json::Null,
            sort_by_date: polygo_core::Json::Null,
            meta_data: polygo_core::Json::Null,
            release_id: polygo_core::Json::Null,
            group_id: String::new(),
            lang: String::new(),
            content: Recipe {
                uid: "r".into(),
                title: "Pasta".into(),
                summary: String::new(),
                description: String::new(),
                conclusion: String::new(),
                extra: String::new(),
                cost: String::new(),
                prep: String::new(),
                cooking: String::new(),
                servings: String::new(),
                difficulty: String::new(),
                image: String::new(),
                component: String::new(),
                likes: polygo_core::Json::Null,
                steps: Vec::new(),
                ingredients: Ingredients { uid: String::new(), plugin: String::new(), ingredients: Vec::new() },
                translations: BTreeSet::new(),
                translated: false,
                lang: String::new(),
            },
        }
    }

    fn message_for(lang: &str, story: &Story) -> StreamMessage {
        let mut s = story.clone();
        s.content.lang = lang_marker(lang);
        let wire = LocalizedSerializer::serialize_story(&s);
        StreamMessage::with_story_json(serde_json::to_string(&wire).expect("serialize"))
    }

    #[tokio::test]
    async fn saves_and_drops_on_success() {
        let cms = Arc::new(InMemoryCmsClient::seeded(vec![story(1)]));
        let stage = PersistStage::new(Arc::clone(&cms) as Arc<dyn CmsClient>, "en", 3, 1000);
        let message = message_for("en", &story(1));

        let outcome = stage.handle(&message).await.expect("handle");
        assert!(matches!(outcome, HandlerOutcome::Drop));

        let fetched = cms.fetch(1).await.expect("fetch");
        assert!(fetched.content.translations.contains("en"));
    }

    #[tokio::test]
    async fn already_present_language_is_dropped_without_saving() {
        let mut seed = story(1);
        seed.content.translations.insert("en".to_string());
        let cms = Arc::new(InMemoryCmsClient::seeded(vec![seed.clone()]));
        let stage = PersistStage::new(Arc::clone(&cms) as Arc<dyn CmsClient>, "en", 3, 1000);
        let message = message_for("en", &seed);

        let outcome = stage.handle(&message).await.expect("handle");
        assert!(matches!(outcome, HandlerOutcome::Drop));
    }
}
