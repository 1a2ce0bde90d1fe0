//! Named format validators.
//!
//! Schemas may tag string values with a `format` the core knows nothing
//! about (`"format": "curie"`). Each such format is served by a
//! [`FormatValidator`] registered in a [`FormatRegistry`], which schema
//! compilation hands to the structural engine.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::{Map, Value};

/// A pluggable semantic check for string values.
pub trait FormatValidator: Send + Sync {
    /// Format name as used in `"format"` schema keywords.
    fn name(&self) -> &str;

    /// Check `value`. `options` carries schema-level settings for the format
    /// and may be empty; plugins fall back to their own defaults then.
    fn validate(&self, value: &str, options: &Map<String, Value>) -> Result<(), String>;
}

/// Explicit table of format plugins, keyed by format name.
#[derive(Clone, Default)]
pub struct FormatRegistry {
    plugins: BTreeMap<String, Arc<dyn FormatValidator>>,
}

impl std::fmt::Debug for FormatRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormatRegistry")
            .field("formats", &self.plugins.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl FormatRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a plugin under its own name, replacing any previous one.
    pub fn register<F: FormatValidator + 'static>(&mut self, plugin: F) -> &mut Self {
        self.plugins
            .insert(plugin.name().to_string(), Arc::new(plugin));
        self
    }

    /// Builder-style [`register`](Self::register).
    pub fn with<F: FormatValidator + 'static>(mut self, plugin: F) -> Self {
        self.register(plugin);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn FormatValidator>> {
        self.plugins.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<dyn FormatValidator>)> {
        self.plugins.iter().map(|(name, plugin)| (name.as_str(), plugin))
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}

/// How strictly a CURIE is matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchType {
    /// `prefix:local`, prefix must be accepted when a namespace list exists.
    Canonical,
    /// Like canonical, but a namespace list is mandatory.
    Basic,
    /// Unprefixed values are accepted when namespaces are declared.
    Loose,
}

impl MatchType {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "canonical" => Some(MatchType::Canonical),
            "basic" => Some(MatchType::Basic),
            "loose" => Some(MatchType::Loose),
            _ => None,
        }
    }
}

/// Offline compact-identifier (`namespace:local`) format.
///
/// Checks the shape of the identifier and, when namespaces are known, that
/// its prefix is one of them. Registry lookups of per-namespace patterns are
/// not performed.
#[derive(Debug, Clone, Default)]
pub struct CurieFormat {
    namespaces: Vec<String>,
}

impl CurieFormat {
    pub const NAME: &'static str = "curie";

    const MATCH_TYPE_OPTION: &'static str = "matchType";
    const NAMESPACE_OPTION: &'static str = "namespace";

    pub fn new() -> Self {
        Self::default()
    }

    /// Namespaces accepted when a schema does not list its own.
    pub fn with_namespaces<I, S>(namespaces: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            namespaces: namespaces.into_iter().map(Into::into).collect(),
        }
    }

    fn options<'a>(
        &'a self,
        options: &'a Map<String, Value>,
    ) -> Result<(MatchType, Vec<&'a str>), String> {
        let match_type = match options.get(Self::MATCH_TYPE_OPTION) {
            None => MatchType::Canonical,
            Some(Value::String(s)) => MatchType::parse(s)
                .ok_or_else(|| format!("unknown '{}' \"{}\"", Self::MATCH_TYPE_OPTION, s))?,
            Some(_) => return Err(format!("'{}' is not a string", Self::MATCH_TYPE_OPTION)),
        };

        let namespaces = match options.get(Self::NAMESPACE_OPTION) {
            None => self.namespaces.iter().map(String::as_str).collect(),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| {
                    item.as_str().ok_or_else(|| {
                        format!("'{}' should be an array of strings", Self::NAMESPACE_OPTION)
                    })
                })
                .collect::<Result<Vec<_>, _>>()?,
            Some(_) => {
                return Err(format!(
                    "'{}' should be an array of strings",
                    Self::NAMESPACE_OPTION
                ))
            }
        };

        Ok((match_type, namespaces))
    }
}

fn is_valid_prefix(prefix: &str) -> bool {
    let mut chars = prefix.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
}

impl FormatValidator for CurieFormat {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn validate(&self, value: &str, options: &Map<String, Value>) -> Result<(), String> {
        let (match_type, namespaces) = self.options(options)?;

        let split = value
            .split_once(':')
            .filter(|(prefix, local)| is_valid_prefix(prefix) && !local.is_empty());

        match (split, match_type) {
            (None, MatchType::Loose) => {
                if namespaces.is_empty() {
                    Err("in 'loose' mode, at least one namespace must be declared".to_string())
                } else if value.trim().is_empty() || value.chars().any(char::is_whitespace) {
                    Err(format!("'{}' is not a valid identifier", value))
                } else {
                    Ok(())
                }
            }
            (None, _) => Err(format!(
                "'{}' is not prefixed by a namespace (expected namespace:identifier)",
                value
            )),
            (Some((prefix, _)), MatchType::Basic) if namespaces.is_empty() => Err(format!(
                "namespace {} cannot be checked: no accepted namespaces declared",
                prefix
            )),
            (Some((prefix, _)), _) => {
                if namespaces.is_empty() || namespaces.iter().any(|ns| ns.eq_ignore_ascii_case(prefix)) {
                    Ok(())
                } else {
                    Err(format!(
                        "namespace {} is not in the list of the accepted ones: {}",
                        prefix,
                        namespaces.join(", ")
                    ))
                }
            }
        }
    }
}
