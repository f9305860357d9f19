//! # Contract Properties
//!
//! Randomised checks of the container, configuration and registry rules.

#[cfg(test)]
mod tests {
    use aerie_types::{
        compose, shared, Bag, BagError, Configuration, ConfigurationError, OverwritePolicy,
        ParamValue, RegistryError, ServiceRegistry,
    };
    use proptest::prelude::*;

    fn key() -> impl Strategy<Value = String> {
        "[a-z][a-z0-9_]{0,11}"
    }

    proptest! {
        // =====================================================================
        // BAG
        // =====================================================================

        #[test]
        fn prop_put_then_get_returns_value(key in key(), value in any::<i64>()) {
            let mut bag = Bag::new();
            bag.put(key.clone(), value).unwrap();
            prop_assert_eq!(*bag.get::<i64>(&key).unwrap(), value);
            prop_assert!(bag.has(&key));
            prop_assert!(bag.has_type::<i64>(&key));
        }

        #[test]
        fn prop_get_with_wrong_type_is_mismatch(key in key(), value in any::<i64>()) {
            let mut bag = Bag::new();
            bag.put(key.clone(), value).unwrap();
            let is_mismatch = matches!(bag.get::<String>(&key), Err(BagError::TypeMismatch { .. }));
            prop_assert!(is_mismatch);
        }

        #[test]
        fn prop_delete_removes_only_that_key(
            keys in proptest::collection::btree_set(key(), 1..8),
        ) {
            let mut bag = Bag::new();
            for (i, k) in keys.iter().enumerate() {
                bag.put(k.clone(), i as u32).unwrap();
            }
            let victim = keys.iter().next().unwrap().clone();

            prop_assert!(bag.delete(&victim));
            prop_assert!(!bag.delete(&victim));
            prop_assert!(!bag.has(&victim));
            prop_assert_eq!(bag.len(), keys.len() - 1);
            let is_missing = matches!(bag.get::<u32>(&victim), Err(BagError::KeyNotFound { .. }));
            prop_assert!(is_missing);
        }

        #[test]
        fn prop_duplicate_put_follows_policy(key in key(), first in any::<u16>(), second in any::<u16>()) {
            let mut strict = Bag::new();
            strict.put(key.clone(), first).unwrap();
            let is_duplicate = matches!(strict.put(key.clone(), second), Err(BagError::DuplicateKey { .. }));
            prop_assert!(is_duplicate);
            prop_assert_eq!(*strict.get::<u16>(&key).unwrap(), first);

            let mut lenient = Bag::with_policy(OverwritePolicy::Replace);
            lenient.put(key.clone(), first).unwrap();
            lenient.put(key.clone(), second).unwrap();
            prop_assert_eq!(*lenient.get::<u16>(&key).unwrap(), second);
        }

        // =====================================================================
        // CONFIGURATION
        // =====================================================================

        #[test]
        fn prop_default_until_overridden(default in any::<i32>(), value in any::<i32>()) {
            let mut config = Configuration::new();
            config.parameter_default("limit", default).unwrap();
            prop_assert_eq!(config.get_parameter::<i32>("limit").unwrap(), default);

            config.set_parameter("limit", value).unwrap();
            prop_assert_eq!(config.get_parameter::<i32>("limit").unwrap(), value);
        }

        #[test]
        fn prop_int_widens_to_double(value in any::<i32>()) {
            let mut config = Configuration::new();
            config.parameter_default("gain", 0.5).unwrap();
            config.set_parameter("gain", value).unwrap();
            prop_assert_eq!(config.get_parameter::<f64>("gain").unwrap(), f64::from(value));
        }

        #[test]
        fn prop_decode_matches_typed_set(values in proptest::collection::vec(any::<i32>(), 0..6)) {
            let mut typed = Configuration::new();
            typed.parameter::<Vec<i32>>("bins").unwrap();
            typed.set_parameter("bins", values.clone()).unwrap();

            let mut decoded = Configuration::new();
            decoded.parameter::<Vec<i32>>("bins").unwrap();
            let text = ParamValue::VecI(values.clone()).to_string();
            decoded.set_parameter_decode("bins", &text).unwrap();

            prop_assert_eq!(decoded.get_parameter::<Vec<i32>>("bins").unwrap(), values);
        }

        #[test]
        fn prop_redeclare_is_rejected(name in key()) {
            let mut config = Configuration::new();
            config.parameter::<bool>(&name).unwrap();
            let is_duplicate = matches!(
                config.parameter_default(&name, 1),
                Err(ConfigurationError::DuplicateParameter { .. })
            );
            prop_assert!(is_duplicate);
        }

        #[test]
        fn prop_compose_prefers_set_rhs(lhs in any::<i32>(), rhs in proptest::option::of(any::<i32>())) {
            let mut left = Configuration::new();
            left.parameter_default("n", lhs).unwrap();
            let mut right = Configuration::new();
            right.parameter::<i32>("n").unwrap();
            if let Some(v) = rhs {
                right.set_parameter("n", v).unwrap();
            }

            let merged = compose(&left, &right);
            prop_assert_eq!(merged.get_parameter::<i32>("n").unwrap(), rhs.unwrap_or(lhs));
        }

        // =====================================================================
        // REGISTRY
        // =====================================================================

        #[test]
        fn prop_duplicate_registration_rejected(name in key()) {
            let mut registry = ServiceRegistry::new();
            registry.register(name.clone(), shared(1_u32)).unwrap();
            let is_duplicate = matches!(
                registry.register(name.clone(), shared(2_u32)),
                Err(RegistryError::DuplicateRegistration { .. })
            );
            prop_assert!(is_duplicate);
            prop_assert_eq!(*registry.resolve::<u32>(&name).unwrap().lock(), 1);
        }

        #[test]
        fn prop_anonymous_resolve_needs_single_or_default(
            names in proptest::collection::btree_set(key(), 1..5),
        ) {
            let mut registry = ServiceRegistry::new();
            for (i, name) in names.iter().enumerate() {
                registry.register(name.clone(), shared(i as u32)).unwrap();
            }

            if names.len() == 1 {
                prop_assert!(registry.resolve::<u32>("").is_ok());
            } else {
                let is_ambiguous = matches!(
                    registry.resolve::<u32>(""),
                    Err(RegistryError::AmbiguousOrMissing { .. })
                );
                prop_assert!(is_ambiguous);

                let last = names.iter().last().unwrap();
                registry.designate_default::<u32>(last).unwrap();
                prop_assert_eq!(*registry.resolve::<u32>("").unwrap().lock(), (names.len() - 1) as u32);
            }
        }
    }
}
