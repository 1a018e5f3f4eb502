//! Property-based test generators using proptest.
//!
//! Rows produced here always validate against [`road_type`](crate::road_type).

use featurekit_core::{Envelope, Value};
use proptest::prelude::*;

/// Strategy for generating non-null envelopes.
pub fn envelope_strategy() -> impl Strategy<Value = Envelope> {
    (-1000.0f64..1000.0, 0.0f64..100.0, -1000.0f64..1000.0, 0.0f64..100.0)
        .prop_map(|(x, w, y, h)| Envelope::new(x, x + w, y, y + h))
}

/// Strategy for generating road names.
pub fn road_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[A-Z][a-z]{0,11}").expect("Invalid regex")
}

/// Strategy for generating a valid road row.
pub fn row_strategy() -> impl Strategy<Value = Vec<Value>> {
    (
        road_name_strategy(),
        prop::option::of(1i64..8),
        prop::option::of(envelope_strategy()),
    )
        .prop_map(|(name, lanes, extent)| vec![Value::from(name), Value::from(lanes), Value::from(extent)])
}

/// Strategy for generating up to `max` road rows.
pub fn rows_strategy(max: usize) -> impl Strategy<Value = Vec<Vec<Value>>> {
    prop::collection::vec(row_strategy(), 0..=max)
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Creates a configuration for thorough tests.
    #[must_use]
    pub fn thorough() -> Self {
        Self {
            cases: 1024,
            max_shrink_iters: 10000,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::road_type;

    proptest! {
        #![proptest_config(PropTestConfig::quick().to_proptest_config())]

        #[test]
        fn generated_rows_validate(row in row_strategy()) {
            prop_assert!(road_type().validate(&row).is_ok());
        }

        #[test]
        fn envelopes_are_not_null(e in envelope_strategy()) {
            prop_assert!(!e.is_null());
            prop_assert!(e.width() >= 0.0);
        }
    }
}
