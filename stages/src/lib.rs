//! Config loading and the three concrete pipeline stages (spec §4.4): `IngestStage`
//! (producer), `TranslateStage` (per-language-pair hop), `PersistStage` (terminal
//! writer) — plus the bounded-retry helper `PersistStage` wraps its CMS calls in.

mod config;
mod ingest;
mod persist;
mod retry;
mod translate_stage;

pub use config::Config;
pub use ingest::{IngestError, IngestStage};
pub use persist::PersistStage;
pub use retry::retry_transient;
pub use translate_stage::TranslateStage;
