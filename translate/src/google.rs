//! [`GoogleTranslateClient`]: a [`TextTranslator`] calling the Google Cloud Translate
//! v2 REST API, grounded on original_source `translator/translator/translator.go`
//! (which wraps the same API via the Go client SDK) but reimplemented as a direct
//! `reqwest` call per spec §1 ("modeled on Google Cloud Translate ... but
//! provider-agnostic").

use polygo_core::{TextTranslator, TranslatorError};
use reqwest::{Client, StatusCode};
use std::future::Future;
use std::pin::Pin;

const ENDPOINT: &str = "https://translation.googleapis.com/language/translate/v2";

/// A [`TextTranslator`] backed by the Google Cloud Translate v2 REST API.
pub struct GoogleTranslateClient {
    http: Client,
    api_key: String,
}

impl GoogleTranslateClient {
    /// Build a client authenticating with `api_key`.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        GoogleTranslateClient { http: Client::new(), api_key: api_key.into() }
    }
}

impl TextTranslator for GoogleTranslateClient {
    fn translate<'a>(
        &'a self,
        text: &'a str,
        lang_from: &'a str,
        lang_to: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String, TranslatorError>> + Send + 'a>> {
        Box::pin(async move {
            let response = self
                .http
                .post(ENDPOINT)
                .query(&[("key", self.api_key.as_str())])
                .json(&serde_json::json!({
                    "q": text,
                    "source": lang_from,
                    "target": lang_to,
                    "format": "text",
                }))
                .send()
                .await
                .map_err(|e| TranslatorError::Transient(e.to_string()))?;

            let status = response.status();
            let body = response.text().await.map_err(|e| TranslatorError::Transient(e.to_string()))?;
            if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
                return Err(TranslatorError::Transient(format!("{status}: {body}")));
            }
            if !status.is_success() {
                return Err(TranslatorError::Rejected(format!("{status}: {body}")));
            }

            let parsed: serde_json::Value =
                serde_json::from_str(&body).map_err(|e| TranslatorError::Rejected(e.to_string()))?;
            parsed
                .pointer("/data/translations/0/translatedText")
                .and_then(serde_json::Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| TranslatorError::Rejected("response missing translatedText".to_string()))
        })
    }
}
