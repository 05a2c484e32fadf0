//! [`StoryblokCmsClient`]: a [`CmsClient`] implementation against the Storyblok-shaped
//! REST surface (spec §6 "CMS HTTP surface consumed").

use polygo_core::{CmsClient, CmsError, Story};
use polygo_serialize::LocalizedSerializer;
use reqwest::{Client, StatusCode};
use std::collections::BTreeSet;
use std::future::Future;
use std::pin::Pin;

/// Connection details for a Storyblok-shaped CMS (spec §6 config keys:
/// `storyblok.token`, `storyblok.oauth`, `storyblok.space`).
#[derive(Debug, Clone)]
pub struct CmsConfig {
    /// Read-only CDN API base, e.g. `https://api.storyblok.com`.
    pub cdn_base: String,
    /// Management API base, e.g. `https://mapi.storyblok.com`.
    pub mapi_base: String,
    /// Public read token for CDN reads.
    pub token: String,
    /// OAuth management token for writes.
    pub oauth: String,
    /// Target space id.
    pub space: String,
}

/// A [`CmsClient`] backed by `reqwest`.
pub struct StoryblokCmsClient {
    http: Client,
    config: CmsConfig,
}

impl StoryblokCmsClient {
    /// Build a client for `config`, reusing one connection-pooled [`reqwest::Client`].
    #[must_use]
    pub fn new(config: CmsConfig) -> Self {
        StoryblokCmsClient { http: Client::new(), config }
    }

    fn map_status(status: StatusCode, body: &str) -> CmsError {
        if status.is_server_error() {
            CmsError::Transient(format!("{status}: {body}"))
        } else if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            CmsError::Auth(format!("{status}: {body}"))
        } else if status == StatusCode::NOT_FOUND {
            CmsError::NotFound(format!("{status}: {body}"))
        } else {
            CmsError::Conflict(format!("{status}: {body}"))
        }
    }

    async fn get_json(&self, url: String) -> Result<serde_json::Value, CmsError> {
        let response = self.http.get(&url).send().await.map_err(|e| CmsError::Transient(e.to_string()))?;
        let status = response.status();
        let body = response.text().await.map_err(|e| CmsError::Transient(e.to_string()))?;
        if !status.is_success() {
            return Err(Self::map_status(status, &body));
        }
        serde_json::from_str(&body).map_err(|e| CmsError::Transient(e.to_string()))
    }
}

impl CmsClient for StoryblokCmsClient {
    fn list_untranslated<'a>(
        &'a self,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Story>, CmsError>> + Send + 'a>> {
        Box::pin(async move {
            let url = format!(
                "{}/v1/cdn/stories?starts_with=recipes&filter_query[translated][in]=false&token={}",
                self.config.cdn_base, self.config.token
            );
            let body = self.get_json(url).await?;
            let stories = body.get("stories").and_then(serde_json::Value::as_array).cloned().unwrap_or_default();
            stories
                .iter()
                .map(|raw| {
                    LocalizedSerializer::deserialize_story(raw, "")
                        .map_err(|e| CmsError::Transient(e.to_string()))
                })
                .collect()
        })
    }

    fn fetch<'a>(&'a self, id: i64) -> Pin<Box<dyn Future<Output = Result<Story, CmsError>> + Send + 'a>> {
        Box::pin(async move {
            let url = format!("{}/v1/cdn/stories/{id}?token={}", self.config.cdn_base, self.config.token);
            let body = self.get_json(url).await?;
            let raw = body.get("story").ok_or_else(|| CmsError::NotFound(format!("story {id}")))?;
            LocalizedSerializer::deserialize_story(raw, "").map_err(|e| CmsError::Transient(e.to_string()))
        })
    }

    fn languages_present<'a>(
        &'a self,
        id: i64,
    ) -> Pin<Box<dyn Future<Output = Result<BTreeSet<String>, CmsError>> + Send + 'a>> {
        Box::pin(async move {
            let story = self.fetch(id).await?;
            Ok(story.content.translations)
        })
    }

    fn save<'a>(&'a self, story: &'a Story) -> Pin<Box<dyn Future<Output = Result<(), CmsError>> + Send + 'a>> {
        Box::pin(async move {
            let url = format!("{}/v1/spaces/{}/stories/{}", self.config.mapi_base, self.config.space, story.id);
            let body = serde_json::json!({
                "story": LocalizedSerializer::serialize_story(story),
                "publish": 1,
            });
            let response = self
                .http
                .put(&url)
                .header("Authorization", &self.config.oauth)
                .json(&body)
                .send()
                .await
                .map_err(|e| CmsError::Transient(e.to_string()))?;
            let status = response.status();
            if status.is_success() {
                return Ok(());
            }
            let text = response.text().await.unwrap_or_default();
            Err(Self::map_status(status, &text))
        })
    }
}
