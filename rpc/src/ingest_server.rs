//! `Ingest.NewStories` RPC method (spec "RPC edge"): triggers one [`IngestStage`] pass
//! and returns the queued recipe ids, grounded on original_source
//! `server/poly.go`'s `StoryBlok.NewStories` client call and
//! `storyblok/storyblok/storyblok.go`'s server-side method of the same name.

use crate::codec::RpcService;
use polygo_core::StreamBroker;
use polygo_stages::IngestStage;
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Exposes [`IngestStage::run_once`] as the single RPC method `Ingest.NewStories`.
pub struct IngestService<B: StreamBroker> {
    stage: Arc<IngestStage<B>>,
}

impl<B: StreamBroker> IngestService<B> {
    /// Wrap `stage` as an RPC service.
    #[must_use]
    pub fn new(stage: Arc<IngestStage<B>>) -> Self {
        IngestService { stage }
    }
}

impl<B: StreamBroker> RpcService for IngestService<B> {
    fn call<'a>(
        &'a self,
        method: &'a str,
        _params: Vec<Value>,
    ) -> Pin<Box<dyn Future<Output = Result<Value, String>> + Send + 'a>> {
        Box::pin(async move {
            if method != "Ingest.NewStories" {
                return Err(format!("unknown method: {method}"));
            }
            let stories = self.stage.run_once().await.map_err(|e| e.to_string())?;
            Ok(serde_json::json!({ "stories": stories }))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polygo_cms::InMemoryCmsClient;
    use polygo_core::{CmsClient, Ingredients, Recipe, ReadBatch, Story, StreamBrokerError, StreamId, StreamMessage};
    use std::collections::BTreeSet;
    use std::time::Duration;

    struct NullBroker;

    impl StreamBroker for NullBroker {
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
            _last_seen: StreamId,
            _count: usize,
        ) -> Pin<Box<dyn Future<Output = Result<ReadBatch, StreamBrokerError>> + Send + 'a>> {
            Box::pin(async { Ok(Vec::new()) })
        }
        fn read_live<'a>(
            &'a self,
            _stream: &'a str,
            _group: &'a str,
            _consumer: &'a str,
            _count: usize,
            _block: Duration,
        ) -> Pin<Box<dyn Future<Output = Result<ReadBatch, StreamBrokerError>> + Send + 'a>> {
            Box::pin(async { Ok(Vec::new()) })
        }
        fn ack_and_forward<'a>(
            &'a self,
            _stream: &'a str,
            _group: &'a str,
            id: StreamId,
            _stream_to: &'a str,
            _message: &'a StreamMessage,
        ) -> Pin<Box<dyn Future<Output = Result<Option<StreamId>, StreamBrokerError>> + Send + 'a>> {
            Box::pin(async move { Ok(Some(id)) })
        }
        fn ack_only<'a>(
            &'a self,
            _stream: &'a str,
            _group: &'a str,
            _id: StreamId,
        ) -> Pin<Box<dyn Future<Output = Result<bool, StreamBrokerError>> + Send + 'a>> {
            Box::pin(async { Ok(true) })
        }
        fn append<'a>(
            &'a self,
            _stream: &'a str,
            _message: &'a StreamMessage,
        ) -> Pin<Box<dyn Future<Output = Result<StreamId, StreamBrokerError>> + Send + 'a>> {
            Box::pin(async { Ok(StreamId { ms: 1, seq: 0 }) })
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
            created_at: chrono::DateTime::UNIX_EPOCH,
            first_published_at: chrono::DateTime::UNIX_EPOCH,
            published_at: chrono::DateTime::UNIX_EPOCH,
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
    async fn new_stories_returns_queued_ids() {
        let cms: Arc<dyn CmsClient> = Arc::new(InMemoryCmsClient::seeded(vec![story(7)]));
        let stage = Arc::new(IngestStage::new(cms, Arc::new(NullBroker), "recipes.new"));
        let service = IngestService::new(stage);

        let result = service.call("Ingest.NewStories", Vec::new()).await.expect("call");
        assert_eq!(result, serde_json::json!({ "stories": [7] }));
    }

    #[tokio::test]
    async fn unknown_method_is_rejected() {
        let cms: Arc<dyn CmsClient> = Arc::new(InMemoryCmsClient::default());
        let stage = Arc::new(IngestStage::new(cms, Arc::new(NullBroker), "recipes.new"));
        let service = IngestService::new(stage);

        let result = service.call("Ingest.Unknown", Vec::new()).await;
        assert!(result.is_err());
    }
}
