//! IngestStage (spec §4.4): a pure producer, triggered by RPC, with no consumer group
//! of its own.

use polygo_core::{CmsClient, StreamBroker, StreamMessage};
use polygo_serialize::LocalizedSerializer;
use std::sync::Arc;
use thiserror::Error;

/// Errors [`IngestStage::run_once`] can surface.
#[derive(Debug, Error)]
pub enum IngestError {
    /// The CMS read failed.
    #[error("CMS error: {0}")]
    Cms(#[from] polygo_core::CmsError),
    /// Appending to the broker failed.
    #[error("broker error: {0}")]
    Broker(#[from] polygo_core::StreamBrokerError),
    /// The document could not be rendered to JSON.
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Fetches untranslated recipes from the CMS and appends one message per recipe to
/// `stream_to` (spec: `recipes.new`).
pub struct IngestStage<B: StreamBroker> {
    cms: Arc<dyn CmsClient>,
    broker: Arc<B>,
    stream_to: String,
}

impl<B: StreamBroker> IngestStage<B> {
    /// Build an ingest stage writing to `stream_to`.
    #[must_use]
    pub fn new(cms: Arc<dyn CmsClient>, broker: Arc<B>, stream_to: impl Into<String>) -> Self {
        IngestStage { cms, broker, stream_to: stream_to.into() }
    }

    /// Run one ingest pass: list untranslated CMS recipes, append each to the broker,
    /// and return the ids queued (the RPC edge returns this list to its caller).
    ///
    /// # Errors
    ///
    /// Returns [`IngestError`] on the first CMS or broker failure; recipes already
    /// appended before the failure remain queued (no rollback — matching the
    /// at-least-once philosophy of the rest of the pipeline).
    pub async fn run_once(&self) -> Result<Vec<i64>, IngestError> {
        let stories = self.cms.list_untranslated().await?;
        let mut queued = Vec::with_capacity(stories.len());
        for story in &stories {
            let wire = LocalizedSerializer::serialize_story(story);
            let json = serde_json::to_string(&wire)?;
            let message = StreamMessage::with_story_json(json);
            self.broker.append(&self.stream_to, &message).await?;
            queued.push(story.id);
        }
        Ok(queued)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polygo_core::{Ingredients, Recipe, Story, StreamBrokerError};
    use std::collections::BTreeSet;
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::Mutex;
    use std::time::Duration;

    struct RecordingBroker {
        appended: Mutex<Vec<(String, StreamMessage)>>,
    }

    impl StreamBroker for RecordingBroker {
        fn ensure_group<'a>(
            &'a self,
            _stream: &'a str,
            _group: &'a str,
        ) -> Pin<Box<dyn Future<Output = Result<(), StreamBrokerError>> + Send + 'a>> {
            Box::pin(async { Ok(()) })
        }
        fn read_history<'a>(
            &'a self,
            _stream: &'a str,
            _group: &'a str,
            _consumer: &'a str,
            _last_seen: polygo_core::StreamId,
            _count: usize,
        ) -> Pin<Box<dyn Future<Output = Result<polygo_core::ReadBatch, StreamBrokerError>> + Send + 'a>> {
            Box::pin(async { Ok(Vec::new()) })
        }
        fn read_live<'a>(
            &'a self,
            _stream: &'a str,
            _group: &'a str,
            _consumer: &'a str,
            _count: usize,
            _block: Duration,
        ) -> Pin<Box<dyn Future<Output = Result<polygo_core::ReadBatch, StreamBrokerError>> + Send + 'a>> {
            Box::pin(async { Ok(Vec::new()) })
        }
        fn ack_and_forward<'a>(
            &'a self,
            _stream: &'a str,
            _group: &'a str,
            id: polygo_core::StreamId,
            _stream_to: &'a str,
            _message: &'a StreamMessage,
        ) -> Pin<Box<dyn Future<Output = Result<Option<polygo_core::StreamId>, StreamBrokerError>> + Send + 'a>>
        {
            Box::pin(async move { Ok(Some(id)) })
        }
        fn ack_only<'a>(
            &'a self,
            _stream: &'a str,
            _group: &'a str,
            _id: polygo_core::StreamId,
        ) -> Pin<Box<dyn Future<Output = Result<bool, StreamBrokerError>> + Send + 'a>> {
            Box::pin(async { Ok(true) })
        }
        fn append<'a>(
            &'a self,
            stream: &'a str,
            message: &'a StreamMessage,
        ) -> Pin<Box<dyn Future<Output = Result<polygo_core::StreamId, StreamBrokerError>> + Send + 'a>> {
            Box::pin(async move {
                self.appended.lock().expect("lock poisoned").push((stream.to_string(), message.clone()));
                Ok(polygo_core::StreamId { ms: 1, seq: 0 })
            })
        }
    }

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

    #[tokio::test]
    async fn appends_one_message_per_untranslated_story() {
        let cms = Arc::new(polygo_cms::InMemoryCmsClient::seeded(vec![story(1), story(2)]));
        let broker = Arc::new(RecordingBroker { appended: Mutex::new(Vec::new()) });
        let stage = IngestStage::new(cms, Arc::clone(&broker), "recipes.new");

        let queued = stage.run_once().await.expect("run_once");

        assert_eq!(queued, vec![1, 2]);
        let appended = broker.appended.lock().expect("lock poisoned");
        assert_eq!(appended.len(), 2);
        assert!(appended.iter().all(|(stream, _)| stream == "recipes.new"));
    }
}
