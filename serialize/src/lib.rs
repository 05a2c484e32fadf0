//! LocalizedSerializer (spec §4.3): renders a recipe so translatable field names carry
//! the CMS's language-suffix convention while non-translatable fields retain their
//! canonical names, and reads that shape back for a chosen language.

mod descriptor;
mod serializer;

pub use serializer::{LocalizedSerializer, SerializeError};
