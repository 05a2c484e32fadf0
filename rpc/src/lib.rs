//! Internal JSON-RPC 1.0-over-TCP edge (spec "RPC edge"): `Ingest.NewStories` and
//! `Translate.Translate`, each served by [`codec::run_server`] on its own port.

mod codec;
mod ingest_server;
mod translate_server;

pub use codec::{run_server, RpcError, RpcService};
pub use ingest_server::IngestService;
pub use translate_server::TranslateService;
