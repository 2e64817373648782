//! jTAC Class Engine
//!
//! A runtime class system for value-conversion, data-access, business-rule
//! and calculation objects. Classes are registered by name, declare
//! validated configuration properties, inherit from a single parent, and
//! are instantiated by name or through short aliases:
//!
//! - **Registry**: class definition, lookup, dependency checks (`registry`)
//! - **Classes**: descriptors, builders, method tables (`class`)
//! - **Config**: property rules and generated accessors (`config`)
//! - **Instances**: property bags, parent delegation, cache invalidation (`instance`)
//! - **Aliases**: short names with preset property values (`alias`)
//! - **Diagnostics**: context trail and the logging choke point (`context`)
//!
//! # Example
//!
//! ```rust,ignore
//! use jtac_engine::{props, ClassBuilder, ClassRegistry, ConfigRule, RuleViolation};
//!
//! let registry = ClassRegistry::new();
//! registry.define(
//!     ClassBuilder::new("Shapes.Base")
//!         .abstract_class()
//!         .config("color", "black"),
//! )?;
//! registry.define(
//!     ClassBuilder::new("Shapes.Circle")
//!         .extend("Shapes.Base")
//!         .config("radius", 0.0)
//!         .config_rule(
//!             "radius",
//!             ConfigRule::validator(|_this, value| {
//!                 let radius = jtac_engine::coerce::check_as_number(&value)?;
//!                 if radius < 0.0 {
//!                     return Err(RuleViolation::expected("a non-negative number"));
//!                 }
//!                 Ok(radius.into())
//!             }),
//!         ),
//! )?;
//!
//! let circle = registry.create("Shapes.Circle", props! { "radius" => 5.0 })?;
//! assert_eq!(circle.invoke("getColor", &[])?, "black".into());
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod alias;
pub mod class;
pub mod coerce;
pub mod config;
pub mod context;
pub mod defaults;
pub mod error;
pub mod instance;
pub mod registry;
pub mod value;

pub use alias::{AliasEntry, AliasOptions, InitFn, Initializer};
pub use class::{
    ClassBuilder, ClassDef, ClassMembers, Invocation, MethodBody, MethodEntry, MethodFn,
};
pub use config::{accessor_name, BuiltinRule, ConfigRule, RuleCheck, ValidatorFn};
pub use context::{push_context, set_logging_enabled, ContextGuard};
pub use defaults::RegistryOptions;
pub use error::{ErrorKind, JtacError, JtacResult, RuleViolation};
pub use instance::{Instance, ObjectRef};
pub use registry::{registry, ClassDefinition, ClassRegistry};
pub use value::{NativeFn, Pattern, PropertyBag, Value};
