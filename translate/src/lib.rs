//! The concurrent recipe translator (spec §4.2): decomposition into per-field units,
//! fan-out to a [`polygo_core::TextTranslator`] backend, collation, and reassembly with
//! language markers.

mod echo;
mod google;
mod skip;
mod translator;

pub use echo::EchoTranslator;
pub use google::GoogleTranslateClient;
pub use skip::{default_recognized_units, should_skip};
pub use translator::{RecipeTranslateError, RecipeTranslator};
