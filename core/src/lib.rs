//! Domain types and collaborator traits for the polygo recipe-translation pipeline.
//!
//! This crate is the shared vocabulary between the stream-processing fabric
//! (`polygo-streams`), the translator (`polygo-translate`), the serializer
//! (`polygo-serialize`), and the stage wiring (`polygo-stages`): the `Story`/`Recipe`
//! document shape, the wire types a broker message carries, the per-field translation
//! work items, and the three capability traits ([`stream_broker::StreamBroker`],
//! [`translator::TextTranslator`], [`cms::CmsClient`]) everything else is written
//! against.

pub mod cms;
pub mod json;
pub mod recipe;
pub mod stream;
pub mod stream_broker;
pub mod translation;
pub mod translator;

pub use cms::{CmsClient, CmsError};
pub use json::Json;
pub use recipe::{lang_marker, Ingredient, Ingredients, Recipe, Story, Step, LANG_MARKER_PREFIX};
pub use stream::{StreamBinding, StreamId, StreamMessage, StreamValue, STORY_FIELD};
pub use stream_broker::{ReadBatch, StreamBroker, StreamBrokerError};
pub use translation::{OwnerId, TranslationResult, TranslationUnit};
pub use translator::{TextTranslator, TranslatorError};
