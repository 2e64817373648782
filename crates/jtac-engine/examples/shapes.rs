//! Defines a small shape hierarchy and creates instances by class name,
//! alias, and JSON options.
//!
//! Run with: `RUST_LOG=jtac=debug cargo run --example shapes`

use jtac_engine::coerce::check_as_number;
use jtac_engine::{props, ClassBuilder, ConfigRule, JtacResult, RuleViolation, Value};
use tracing_subscriber::EnvFilter;

fn main() -> JtacResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let registry = jtac_engine::registry();

    registry.define(
        ClassBuilder::new("Shapes.Base")
            .abstract_class()
            .config("color", "black")
            .method("describe", |inv, _args| {
                let this = inv.this();
                Ok(Value::from(format!(
                    "{} ({})",
                    this.full_class_name(),
                    this.get_property("color")?
                )))
            }),
    )?;

    registry.define(
        ClassBuilder::new("Shapes.Circle")
            .extend("Shapes.Base")
            .config("radius", 0.0)
            .config_rule(
                "radius",
                ConfigRule::validator(|_this, value| {
                    let radius = check_as_number(&value)?;
                    if radius < 0.0 {
                        return Err(RuleViolation::expected("a non-negative number"));
                    }
                    Ok(Value::Number(radius))
                }),
            )
            .method("describe", |inv, args| {
                let base = inv.call_parent(args)?;
                let radius = inv.this().get_property("radius")?;
                Ok(Value::from(format!("{} r={}", base.as_str().unwrap_or(""), radius)))
            }),
    )?;

    registry.define_alias("circle", "Shapes.Circle", props! { "color" => "red" })?;

    let circle = registry.create("Shapes.Circle", props! { "radius" => 5 })?;
    println!("{}", circle.invoke("describe", &[])?);

    let aliased = registry.create("circle", props! { "radius" => 2 })?;
    println!("{}", aliased.invoke("describe", &[])?);

    let from_json = registry.create_from_json(serde_json::json!({
        "jtacClass": "Shapes.Circle",
        "color": "green",
        "radius": 1.5
    }))?;
    println!("{}", from_json.invoke("describe", &[])?);

    if let Err(err) = registry.create("Shapes.Circle", props! { "radius" => -1 }) {
        println!("rejected: {}", err);
    }

    Ok(())
}
