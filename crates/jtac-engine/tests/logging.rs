//! Logging choke point tests. Each test flips the process-wide logging
//! switch, so they run serially.

use std::io;
use std::sync::Arc;

use parking_lot::Mutex;
use serial_test::serial;

use jtac_engine::context::logging_enabled;
use jtac_engine::{
    set_logging_enabled, ClassBuilder, ClassRegistry, ConfigRule, ErrorKind, RegistryOptions,
};

#[derive(Clone, Default)]
struct Capture(Arc<Mutex<Vec<u8>>>);

impl Capture {
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }
}

impl io::Write for Capture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn with_capture<F: FnOnce()>(f: F) -> String {
    let capture = Capture::default();
    let writer = capture.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::DEBUG)
        .finish();
    tracing::subscriber::with_default(subscriber, f);
    capture.text()
}

#[test]
#[serial]
fn test_errors_are_logged_with_context() {
    set_logging_enabled(true);
    let registry = ClassRegistry::new();

    let output = with_capture(|| {
        let err = registry.create("Shapes.Missing", ()).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::ClassNotFound(_)));
    });

    assert!(output.contains("ERROR"));
    assert!(output.contains("Shapes.Missing"));
    assert!(output.contains("create Shapes.Missing"));
}

#[test]
#[serial]
fn test_input_errors_use_their_own_target() {
    set_logging_enabled(true);
    let registry = ClassRegistry::new();

    let output = with_capture(|| {
        assert!(registry.create_from_json(serde_json::json!([1, 2])).is_err());
    });

    assert!(output.contains("jtac::input"));
}

#[test]
#[serial]
fn test_silenced_logging_still_returns_errors() {
    set_logging_enabled(false);
    let registry = ClassRegistry::new();
    registry
        .define(
            ClassBuilder::new("Mode")
                .config("mode", "a")
                .config_rule("mode", ConfigRule::one_of(["a", "b"])),
        )
        .unwrap();
    let obj = registry.create("Mode", ()).unwrap();

    let output = with_capture(|| {
        let err = obj.set_property("mode", "c").unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::InvalidPropertyValue { .. }));
    });

    assert!(!output.contains("ERROR"));
    set_logging_enabled(true);
}

#[test]
#[serial]
fn test_registry_options_silence_logging() {
    set_logging_enabled(true);
    let registry = ClassRegistry::with_options(RegistryOptions {
        log_errors: false,
        ..RegistryOptions::default()
    });
    assert!(!logging_enabled());
    assert!(registry.create("Missing", ()).is_err());
    set_logging_enabled(true);
}

#[test]
#[serial]
fn test_definitions_emit_debug_events() {
    set_logging_enabled(true);
    let registry = ClassRegistry::new();

    let output = with_capture(|| {
        registry.define(ClassBuilder::new("Shapes.Dot")).unwrap();
        registry.define_alias("dot", "Shapes.Dot", ()).unwrap();
    });

    assert!(output.contains("class defined"));
    assert!(output.contains("alias defined"));
}

#[test]
#[serial]
fn test_prefix_kept_when_stripping_disabled() {
    let registry = ClassRegistry::with_options(RegistryOptions {
        strip_namespace_prefix: false,
        ..RegistryOptions::default()
    });
    registry.define(ClassBuilder::new("Shapes.Dot")).unwrap();
    assert!(registry.is_defined("Shapes.Dot"));
    assert!(!registry.is_defined("jTAC.Shapes.Dot"));
}

#[test]
#[serial]
fn test_redefine_warns() {
    set_logging_enabled(true);
    let registry = ClassRegistry::new();
    registry.define(ClassBuilder::new("Shapes.Dot")).unwrap();

    let output = with_capture(|| {
        registry.redefine(ClassBuilder::new("Shapes.Dot")).unwrap();
    });

    assert!(output.contains("WARN"));
    assert!(output.contains("replaced"));
}
