//! Explicit per-record field descriptors, standing in for the reflection-driven field
//! naming the original implementation used (spec §9 Design Notes: "reflection-driven
//! JSON naming becomes explicit per-record serialization descriptors").

use serde_json::Value;

/// One scalar field's serialization identity: its canonical name and whether it
/// carries the record's language suffix on the wire.
pub struct FieldSpec {
    /// The field's name with no suffix applied.
    pub canonical: &'static str,
    /// `true` if this field's wire key gets the language marker appended.
    pub translatable: bool,
}

/// The wire key for `spec` given `lang` (the record's language marker, e.g.
/// `"__i18n__en"`, or `""` for the source language / non-translatable fields).
#[must_use]
pub fn wire_key(spec: &FieldSpec, lang: &str) -> String {
    if spec.translatable && !lang.is_empty() {
        format!("{}{}", spec.canonical, lang)
    } else {
        spec.canonical.to_string()
    }
}

/// Generic emitter (spec §9: "consumed by a generic emitter"): given a record's field
/// values paired with their descriptors, build the flat wire object's field map.
#[must_use]
pub fn emit(fields: Vec<(FieldSpec, Value)>, lang: &str) -> serde_json::Map<String, Value> {
    let mut map = serde_json::Map::with_capacity(fields.len());
    for (spec, value) in fields {
        map.insert(wire_key(&spec, lang), value);
    }
    map
}

/// Read a scalar field back out of a wire object, given the same descriptor and
/// language used to serialize it.
#[must_use]
pub fn read_str(map: &serde_json::Map<String, Value>, spec: &FieldSpec, lang: &str) -> String {
    map.get(&wire_key(spec, lang)).and_then(Value::as_str).unwrap_or_default().to_string()
}
