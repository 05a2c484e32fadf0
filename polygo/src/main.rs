//! Process entry point (spec "Process topology"): assembles config, the shared Redis
//! broker and CMS client, one `StreamConsumer` task per stage binding, the two RPC
//! servers, and the HTTP trigger/health edge, then waits for Ctrl-C/SIGTERM and
//! broadcasts shutdown to every task.
//!
//! Grounded on the teacher's `examples/ticketing/src/main.rs`: tracing-subscriber init,
//! a `shutdown_signal()` future raced against every spawned task, a "spawn and collect
//! the handles" assembly with `tokio::sync::broadcast` fanning shutdown out to the
//! RPC/HTTP edges and to each consumer's own shutdown channel.

use polygo_cms::{CmsConfig, StoryblokCmsClient};
use polygo_core::{CmsClient, StreamBinding, TextTranslator};
use polygo_stages::{Config, IngestStage, PersistStage, TranslateStage};
use polygo_streams::{RedisStreamBroker, StreamConsumer};
use polygo_translate::{EchoTranslator, GoogleTranslateClient, RecipeTranslator};
use std::sync::Arc;
use tokio::signal;
use tokio::sync::broadcast;
use tracing::info;

const INGEST_STREAM: &str = "recipes.new";

fn translated_stream(lang: &str) -> String {
    format!("recipes.translated.{lang}")
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).init();

    let config = Config::from_env();
    info!(target_languages = ?config.target_languages, "starting polygo");

    let broker = Arc::new(RedisStreamBroker::connect(&config.redis_url).await?);
    let cms: Arc<dyn CmsClient> = Arc::new(StoryblokCmsClient::new(CmsConfig {
        cdn_base: config.storyblok_cdn_base.clone(),
        mapi_base: config.storyblok_mapi_base.clone(),
        token: config.storyblok_token.clone(),
        oauth: config.storyblok_oauth.clone(),
        space: config.storyblok_space.clone(),
    }));

    let (edge_shutdown_tx, _) = broadcast::channel::<()>(1);
    let mut consumer_shutdown_txs = Vec::new();
    let mut tasks = Vec::new();

    let ingest = Arc::new(IngestStage::new(Arc::clone(&cms), Arc::clone(&broker), INGEST_STREAM));

    for lang in config.target_languages.clone() {
        let translator = build_translator(&config);
        let recipe_translator = RecipeTranslator::new(translator, config.recognized_units.clone());
        let translate_stage = Arc::new(TranslateStage::new(
            recipe_translator,
            config.source_language.clone(),
            lang.clone(),
            String::new(),
            config.target_languages.clone(),
        ));
        let translate_binding = StreamBinding::forwarding(
            INGEST_STREAM,
            format!("translate.{lang}"),
            "polygo",
            translated_stream(&lang),
        )
        .with_languages(config.source_language.clone(), lang.clone());
        let (consumer, tx) =
            StreamConsumer::builder(Arc::clone(&broker)).binding(translate_binding).handler(translate_stage).build();
        consumer_shutdown_txs.push(tx);
        let translate_label = lang.clone();
        tasks.push(tokio::spawn(async move {
            if let Err(e) = consumer.run().await {
                tracing::error!(lang = %translate_label, error = %e, "translate consumer exited with an error");
            }
        }));

        let persist_stage = Arc::new(PersistStage::new(
            Arc::clone(&cms),
            lang.clone(),
            config.cms_retry_bound,
            config.persist_rate_limit_per_sec,
        ));
        let persist_binding = StreamBinding::terminal(translated_stream(&lang), format!("persist.{lang}"), "polygo");
        let (consumer, tx) =
            StreamConsumer::builder(Arc::clone(&broker)).binding(persist_binding).handler(persist_stage).build();
        consumer_shutdown_txs.push(tx);
        let persist_label = lang.clone();
        tasks.push(tokio::spawn(async move {
            if let Err(e) = consumer.run().await {
                tracing::error!(lang = %persist_label, error = %e, "persist consumer exited with an error");
            }
        }));
    }

    let rpc_ingest = Arc::clone(&ingest);
    let rpc_ingest_port = config.rpc_ingest_port;
    let ingest_shutdown = edge_shutdown_tx.subscribe();
    tasks.push(tokio::spawn(async move {
        let service = Arc::new(polygo_rpc::IngestService::new(rpc_ingest));
        if let Err(e) = polygo_rpc::run_server(rpc_ingest_port, service, ingest_shutdown).await {
            tracing::error!(error = %e, "Ingest.NewStories RPC server exited with an error");
        }
    }));

    let rpc_translate_port = config.rpc_translate_port;
    let rpc_translator = build_translator(&config);
    let rpc_recipe_translator = RecipeTranslator::new(rpc_translator, config.recognized_units.clone());
    let rpc_target_languages = config.target_languages.clone();
    let rpc_source_language = config.source_language.clone();
    let translate_shutdown = edge_shutdown_tx.subscribe();
    tasks.push(tokio::spawn(async move {
        let Some(lang_to) = rpc_target_languages.first().cloned() else {
            tracing::warn!("no target languages configured, Translate.Translate RPC server not started");
            return;
        };
        let service = Arc::new(polygo_rpc::TranslateService::new(
            rpc_recipe_translator,
            rpc_source_language,
            lang_to,
            String::new(),
            rpc_target_languages,
        ));
        if let Err(e) = polygo_rpc::run_server(rpc_translate_port, service, translate_shutdown).await {
            tracing::error!(error = %e, "Translate.Translate RPC server exited with an error");
        }
    }));

    let http_port = config.http_port;
    let http_ingest = Arc::clone(&ingest);
    let mut http_shutdown = edge_shutdown_tx.subscribe();
    tasks.push(tokio::spawn(async move {
        let app = polygo_http::build_router(http_ingest);
        let listener = match tokio::net::TcpListener::bind(("0.0.0.0", http_port)).await {
            Ok(listener) => listener,
            Err(e) => {
                tracing::error!(error = %e, "failed to bind HTTP listener");
                return;
            }
        };
        let shutdown = async move {
            let _ = http_shutdown.recv().await;
        };
        if let Err(e) = axum::serve(listener, app).with_graceful_shutdown(shutdown).await {
            tracing::error!(error = %e, "HTTP server exited with an error");
        }
    }));

    shutdown_signal().await;
    info!("shutting down");
    for tx in &consumer_shutdown_txs {
        let _ = tx.send(());
    }
    let _ = edge_shutdown_tx.send(());
    for task in tasks {
        let _ = task.await;
    }

    Ok(())
}

fn build_translator(config: &Config) -> Arc<dyn TextTranslator> {
    if config.google_translate_api_key.is_empty() {
        Arc::new(EchoTranslator)
    } else {
        Arc::new(GoogleTranslateClient::new(config.google_translate_api_key.clone()))
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };
    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { info!("received Ctrl+C, shutting down gracefully"); },
        () = terminate => { info!("received SIGTERM, shutting down gracefully"); },
    }
}
