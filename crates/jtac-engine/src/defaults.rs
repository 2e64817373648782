//! Default constants and options for registry configuration.

/// Namespace prefix tolerated (and stripped) on class names passed to lookups.
pub const NAMESPACE_PREFIX: &str = "jTAC.";

/// Property bag key naming the class to create when no explicit name is given.
pub const CLASS_DISCRIMINATOR: &str = "jtacClass";

/// Method name under which constructors are tracked for parent delegation.
pub const CONSTRUCTOR_METHOD: &str = "constructor";

/// Environment variable that silences the logging choke point when set to
/// `0`, `off` or `false`.
pub const LOG_ENV_VAR: &str = "JTAC_LOG";

/// Maximum alias indirections followed before an alias chain is rejected.
pub const MAX_ALIAS_DEPTH: usize = 32;

/// Options applied when a registry is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryOptions {
    /// Strip a leading [`NAMESPACE_PREFIX`] from names passed to lookups.
    pub strip_namespace_prefix: bool,
    /// Whether errors and warnings are written to the log.
    pub log_errors: bool,
}

impl RegistryOptions {
    /// Read options from the process environment.
    pub fn from_env() -> Self {
        let log_errors = match std::env::var(LOG_ENV_VAR) {
            Ok(value) => !matches!(
                value.trim().to_ascii_lowercase().as_str(),
                "0" | "off" | "false"
            ),
            Err(_) => true,
        };
        Self {
            log_errors,
            ..Self::default()
        }
    }
}

impl Default for RegistryOptions {
    fn default() -> Self {
        Self {
            strip_namespace_prefix: true,
            log_errors: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = RegistryOptions::default();
        assert!(options.strip_namespace_prefix);
        assert!(options.log_errors);
    }
}
