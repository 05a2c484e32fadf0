//! The skip predicate (spec §4.2): text that is passed through unchanged instead of
//! being sent to the translation backend.

use std::collections::HashSet;

/// `true` if `text` should bypass the translation backend: empty, a finite base-10
/// number, or a member of `recognized_units`.
#[must_use]
pub fn should_skip(text: &str, recognized_units: &HashSet<String>) -> bool {
    text.is_empty() || text.parse::<f64>().is_ok() || recognized_units.contains(text)
}

/// The default recognized-units set (spec §4.2: `{gr, kg, ml, lt}`), overridable via
/// configuration.
#[must_use]
pub fn default_recognized_units() -> HashSet<String> {
    ["gr", "kg", "ml", "lt"].into_iter().map(String::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn skips_empty_strings() {
        assert!(should_skip("", &default_recognized_units()));
    }

    #[test]
    fn skips_numbers_integer_and_decimal() {
        let units = default_recognized_units();
        assert!(should_skip("42", &units));
        assert!(should_skip("3.14", &units));
        assert!(should_skip("-7", &units));
    }

    #[test]
    fn skips_recognized_units() {
        assert!(should_skip("gr", &default_recognized_units()));
        assert!(!should_skip("cup", &default_recognized_units()));
    }

    #[test]
    fn does_not_skip_ordinary_text() {
        assert!(!should_skip("Sbattere le uova", &default_recognized_units()));
    }

    proptest! {
        /// Any finite number's decimal rendering is skipped, regardless of magnitude
        /// or sign (spec §4.2: "a finite base-10 number" bypasses the backend).
        #[test]
        fn any_finite_number_is_skipped(n in any::<f64>().prop_filter("finite", |n| n.is_finite())) {
            prop_assert!(should_skip(&n.to_string(), &default_recognized_units()));
        }

        /// Every member of the recognized-units set is skipped, independent of which
        /// other units happen to be configured alongside it.
        #[test]
        fn recognized_unit_is_always_skipped(
            unit in prop::sample::select(vec!["gr", "kg", "ml", "lt"]),
            extra in prop::collection::hash_set("[a-z]{2,4}", 0..4),
        ) {
            let mut units = extra;
            units.insert(unit.to_string());
            prop_assert!(should_skip(unit, &units));
        }

        /// Alphabetic text that is neither a recognized unit nor a numeric-style token
        /// (`nan`/`inf`/`infinity` parse as `f64`) is never skipped.
        #[test]
        fn ordinary_alphabetic_text_is_never_skipped(text in "[a-zA-Z]{2,20}") {
            let units = default_recognized_units();
            prop_assume!(!units.contains(&text));
            prop_assume!(text.parse::<f64>().is_err());
            prop_assert!(!should_skip(&text, &units));
        }
    }
}
