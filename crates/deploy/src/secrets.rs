//! Secret acquisition.
//!
//! Secret-bearing config fields are written as [`SecretRef`]s and resolved once,
//! through a [`SecretProvider`], when the config provider is built. Missing values
//! resolve to `None`: failing is left to whoever dereferences them later.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, de};

/// Reference to a secret value, either inline or taken from a named variable.
///
/// In TOML this is either a plain string or a table `{ env = "NAME" }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SecretRef {
    /// Read the value from the named variable.
    Env { env: String },
    /// Use the value as written. Numbers and booleans are kept in their textual form.
    Literal(#[serde(deserialize_with = "scalar_to_string")] String),
}

/// Deserialize any scalar into its textual form.
fn scalar_to_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    struct ScalarVisitor;

    impl de::Visitor<'_> for ScalarVisitor {
        type Value = String;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a string, number or boolean")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_string<E: de::Error>(self, v: String) -> Result<String, E> {
            Ok(v)
        }

        fn visit_bool<E: de::Error>(self, v: bool) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_i128<E: de::Error>(self, v: i128) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_u128<E: de::Error>(self, v: u128) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<String, E> {
            Ok(v.to_string())
        }
    }

    deserializer.deserialize_any(ScalarVisitor)
}

impl SecretRef {
    /// Reference a named variable.
    pub fn env(name: impl Into<String>) -> Self {
        Self::Env { env: name.into() }
    }

    /// Reference an inline value.
    pub fn literal(value: impl Into<String>) -> Self {
        Self::Literal(value.into())
    }

    /// Resolve the reference. Blank values count as absent.
    pub fn resolve(&self, secrets: &impl SecretProvider) -> Option<Secret> {
        let value = match self {
            SecretRef::Env { env } => secrets.get(env),
            SecretRef::Literal(value) => Some(value.clone()),
        };

        value
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .map(Secret)
    }
}

/// A resolved secret. Its `Debug` output is redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Access the underlying value.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

/// Source of named secret values.
pub trait SecretProvider {
    /// Look up a value by name.
    fn get(&self, name: &str) -> Option<String>;
}

impl<T: SecretProvider + ?Sized> SecretProvider for &T {
    fn get(&self, name: &str) -> Option<String> {
        (**self).get(name)
    }
}

/// Reads secrets from the process environment.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvSecrets;

impl SecretProvider for EnvSecrets {
    fn get(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

/// Fixed set of secrets, mostly useful in tests.
#[derive(Debug, Default, Clone)]
pub struct StaticSecrets(BTreeMap<String, String>);

impl StaticSecrets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a named value.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }
}

impl SecretProvider for StaticSecrets {
    fn get(&self, name: &str) -> Option<String> {
        self.0.get(name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_env_reference() {
        let secrets = StaticSecrets::new().with("PRIVATE_KEY", "0xabc");
        let secret = SecretRef::env("PRIVATE_KEY").resolve(&secrets);
        assert_eq!(secret, Some(Secret::new("0xabc")));
    }

    #[test]
    fn test_missing_and_blank_values_are_absent() {
        let secrets = StaticSecrets::new().with("BLANK", "   ");
        assert_eq!(SecretRef::env("MISSING").resolve(&secrets), None);
        assert_eq!(SecretRef::env("BLANK").resolve(&secrets), None);
        assert_eq!(SecretRef::literal("").resolve(&secrets), None);
    }

    #[test]
    fn test_literal_passthrough() {
        let secret = SecretRef::literal("http://127.0.0.1:7545").resolve(&StaticSecrets::new());
        assert_eq!(secret.unwrap().expose(), "http://127.0.0.1:7545");
    }

    #[test]
    fn test_secret_debug_is_redacted() {
        let secret = Secret::new("super-secret");
        assert_eq!(format!("{secret:?}"), "Secret(***)");
    }

    #[test]
    fn test_secret_ref_toml_forms() {
        #[derive(Deserialize)]
        struct Holder {
            a: SecretRef,
            b: SecretRef,
            c: SecretRef,
        }

        let holder: Holder = toml::from_str(
            r#"
            a = "literal"
            b = { env = "GOERLI_URL" }
            c = 123456789
            "#,
        )
        .unwrap();

        assert_eq!(holder.a, SecretRef::literal("literal"));
        assert_eq!(holder.b, SecretRef::env("GOERLI_URL"));
        assert_eq!(holder.c, SecretRef::literal("123456789"));
    }
}
