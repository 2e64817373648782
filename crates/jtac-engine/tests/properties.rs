//! Property tests for the class engine.
//!
//! # Invariants tested:
//! 1. Defaults round-trip: a getter right after creation returns the default
//! 2. Allowed-value rules reject outsiders and keep the stored value
//! 3. Duplicate definitions fail and leave the original in place
//! 4. The context trail has the same depth after every public call
//!
//! Reproducible: Set `PROPTEST_SEED` environment variable for deterministic runs

use std::sync::Arc;

use proptest::prelude::*;

use jtac_engine::context::context_depth;
use jtac_engine::{props, ClassBuilder, ClassRegistry, ConfigRule, ErrorKind, Value};

fn fast_config() -> ProptestConfig {
    ProptestConfig {
        cases: 64,
        max_shrink_iters: 256,
        ..ProptestConfig::default()
    }
}

fn primitive_default() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Int),
        (-1.0e12f64..1.0e12).prop_map(Value::Number),
        "[a-zA-Z0-9 ]{0,16}".prop_map(Value::Str),
        prop::collection::vec(any::<i32>().prop_map(Value::from), 0..4).prop_map(Value::Array),
    ]
}

fn class_name() -> impl Strategy<Value = String> {
    "[A-Z][a-z]{1,8}(\\.[A-Z][a-z]{1,8})?"
}

#[derive(Debug, Clone)]
enum Call {
    Define(String),
    DefineOrphan(String),
    Create(String),
    CreateMissing,
    SetValid(i64),
    SetInvalid(String),
    CallParentOutside,
}

fn call() -> impl Strategy<Value = Call> {
    prop_oneof![
        class_name().prop_map(Call::Define),
        class_name().prop_map(Call::DefineOrphan),
        class_name().prop_map(Call::Create),
        Just(Call::CreateMissing),
        any::<i64>().prop_map(Call::SetValid),
        "[a-z]{1,6}".prop_map(Call::SetInvalid),
        Just(Call::CallParentOutside),
    ]
}

proptest! {
    #![proptest_config(fast_config())]

    /// Property: getters return the declared default after creation
    #[test]
    fn prop_default_round_trip(default in primitive_default()) {
        let registry = ClassRegistry::new();
        registry
            .define(ClassBuilder::new("Holder").config("value", default.clone()))
            .unwrap();

        let obj = registry.create("Holder", ()).unwrap();
        prop_assert_eq!(obj.invoke("getValue", &[]).unwrap(), default);
    }

    /// Property: values outside an allowed set are rejected
    #[test]
    fn prop_one_of_rejects_outsiders(
        allowed in prop::collection::btree_set("[a-m]{1,6}", 1..6),
        candidate in "[n-z]{1,6}",
    ) {
        let allowed: Vec<String> = allowed.into_iter().collect();
        let default = allowed[0].clone();

        let registry = ClassRegistry::new();
        registry
            .define(
                ClassBuilder::new("Choice")
                    .config("pick", default.as_str())
                    .config_rule("pick", ConfigRule::one_of(allowed.clone())),
            )
            .unwrap();

        let obj = registry.create("Choice", ()).unwrap();
        let err = obj.invoke("setPick", &[Value::from(candidate)]).unwrap_err();
        let is_invalid = matches!(err.kind(), ErrorKind::InvalidPropertyValue { .. });
        prop_assert!(is_invalid);
        prop_assert_eq!(obj.get_property("pick").unwrap(), Value::from(default));

        let last = allowed[allowed.len() - 1].clone();
        obj.invoke("setPick", &[Value::from(last.as_str())]).unwrap();
        prop_assert_eq!(obj.get_property("pick").unwrap(), Value::from(last));
    }

    /// Property: defining a name twice fails and keeps the first definition
    #[test]
    fn prop_duplicate_define_keeps_original(name in class_name()) {
        let registry = ClassRegistry::new();
        let original = registry
            .define(ClassBuilder::new(name.as_str()).config("marker", 1))
            .unwrap();

        let err = registry
            .define(ClassBuilder::new(name.as_str()).config("marker", 2))
            .unwrap_err();
        prop_assert_eq!(err.kind(), &ErrorKind::DuplicateClass(name.clone()));

        let current = registry.find_class(&name).unwrap();
        prop_assert!(Arc::ptr_eq(&original, &current));
        let obj = registry.create(&name, ()).unwrap();
        prop_assert_eq!(obj.get_property("marker").unwrap(), Value::Int(1));
    }

    /// Property: no public call leaves context labels behind
    #[test]
    fn prop_context_balanced(calls in prop::collection::vec(call(), 1..24)) {
        let registry = ClassRegistry::new();
        registry
            .define(
                ClassBuilder::new("Base")
                    .config("count", 0)
                    .config("mode", "a")
                    .config_rule("mode", ConfigRule::one_of(["a", "b"])),
            )
            .unwrap();
        let obj = registry.create("Base", ()).unwrap();

        let depth = context_depth();
        for call in calls {
            let _ = match call {
                Call::Define(name) => registry
                    .define(ClassBuilder::new(name).extend("Base"))
                    .map(|_| ()),
                Call::DefineOrphan(name) => registry
                    .define(ClassBuilder::new(name).extend("Nowhere"))
                    .map(|_| ()),
                Call::Create(name) => registry.create(&name, props! { "count" => 1 }).map(|_| ()),
                Call::CreateMissing => registry.create("", ()).map(|_| ()),
                Call::SetValid(count) => obj.set_property("count", count),
                Call::SetInvalid(mode) => obj.set_property("mode", mode),
                Call::CallParentOutside => obj.call_parent(&[]).map(|_| ()),
            };
            prop_assert_eq!(context_depth(), depth);
        }
    }
}
