use super::{ConfigurationSnapshot, DEFAULTS};
use crate::core::{MetaError, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Prefix accepted (and stripped) on keys read from properties sources.
const LEGACY_KEY_PREFIX: &str = "isis.";

/// Layered configuration builder.
///
/// Layers are applied in order: built-in defaults, then every properties
/// source in the order it was added, then explicit overrides. Later layers
/// win.
///
/// # Examples
///
/// ```
/// use facetstore::config::{ConfigurationBuilder, ActionPolicy};
///
/// let config = ConfigurationBuilder::new()
///     .properties("services.command.actions = all")?
///     .set("objects.editing", "false")
///     .build();
///
/// assert_eq!(config.command_policy()?, ActionPolicy::All);
/// # Ok::<(), facetstore::MetaError>(())
/// ```
#[derive(Debug, Clone)]
pub struct ConfigurationBuilder {
    include_defaults: bool,
    layers: Vec<BTreeMap<String, String>>,
    overrides: BTreeMap<String, String>,
}

impl Default for ConfigurationBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigurationBuilder {
    pub fn new() -> Self {
        Self {
            include_defaults: true,
            layers: Vec::new(),
            overrides: BTreeMap::new(),
        }
    }

    /// Skip the built-in defaults layer.
    pub fn without_defaults(mut self) -> Self {
        self.include_defaults = false;
        self
    }

    /// Add a layer parsed from properties text.
    pub fn properties(mut self, text: &str) -> Result<Self> {
        self.layers.push(parse_properties(text)?);
        Ok(self)
    }

    /// Add a layer read from a properties file.
    pub fn properties_file<P: AsRef<Path>>(self, path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| {
            MetaError::Configuration(format!(
                "Failed to read configuration file '{}': {}",
                path.display(),
                e
            ))
        })?;
        self.properties(&text)
    }

    /// Set a single value in the override layer.
    pub fn set(mut self, key: &str, value: &str) -> Self {
        self.overrides.insert(normalize_key(key), value.to_string());
        self
    }

    pub fn build(self) -> ConfigurationSnapshot {
        let mut values = BTreeMap::new();
        if self.include_defaults {
            for (key, value) in DEFAULTS {
                values.insert((*key).to_string(), (*value).to_string());
            }
        }
        for layer in self.layers {
            values.extend(layer);
        }
        values.extend(self.overrides);
        tracing::debug!(keys = values.len(), "configuration snapshot built");
        ConfigurationSnapshot::from_map(values)
    }
}

fn normalize_key(key: &str) -> String {
    let key = key.trim();
    key.strip_prefix(LEGACY_KEY_PREFIX).unwrap_or(key).to_string()
}

/// Parse `key = value` / `key: value` lines; `#` and `!` start comments.
fn parse_properties(text: &str) -> Result<BTreeMap<String, String>> {
    let mut values = BTreeMap::new();
    for (index, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
            continue;
        }
        let split_at = line.find(['=', ':']).ok_or_else(|| {
            MetaError::Configuration(format!(
                "Line {}: expected 'key = value', got '{}'",
                index + 1,
                line
            ))
        })?;
        let key = normalize_key(&line[..split_at]);
        if key.is_empty() {
            return Err(MetaError::Configuration(format!(
                "Line {}: empty key",
                index + 1
            )));
        }
        let value = line[split_at + 1..].trim().to_string();
        values.insert(key, value);
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ActionPolicy, COMMAND_ACTIONS_KEY, OBJECTS_EDITING_KEY};
    use std::io::Write;

    #[test]
    fn test_defaults_are_included() {
        let config = ConfigurationBuilder::new().build();
        assert_eq!(config.get(COMMAND_ACTIONS_KEY), Some("none"));
        assert_eq!(config.get(OBJECTS_EDITING_KEY), Some("true"));
    }

    #[test]
    fn test_later_layers_win() {
        let config = ConfigurationBuilder::new()
            .properties("services.command.actions = ignoreQueryOnly")
            .unwrap()
            .properties("isis.services.command.actions: all")
            .unwrap()
            .build();
        assert_eq!(config.command_policy().unwrap(), ActionPolicy::All);

        let config = ConfigurationBuilder::new()
            .set(COMMAND_ACTIONS_KEY, "none")
            .properties("services.command.actions = all")
            .unwrap()
            .build();
        // overrides are applied last regardless of call order
        assert_eq!(config.command_policy().unwrap(), ActionPolicy::None);
    }

    #[test]
    fn test_comments_and_blank_lines() {
        let text = "# comment\n\n! another\nobjects.editing=false\n";
        let config = ConfigurationBuilder::new()
            .without_defaults()
            .properties(text)
            .unwrap()
            .build();
        assert_eq!(config.len(), 1);
        assert!(!config.objects_editing().unwrap());
    }

    #[test]
    fn test_malformed_line_rejected() {
        let err = ConfigurationBuilder::new()
            .properties("this line has no separator")
            .unwrap_err();
        assert!(matches!(err, MetaError::Configuration(_)));
    }

    #[test]
    fn test_properties_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "services.publish.actions = all").unwrap();
        let config = ConfigurationBuilder::new()
            .properties_file(file.path())
            .unwrap()
            .build();
        assert_eq!(config.publish_action_policy().unwrap(), ActionPolicy::All);
    }

    #[test]
    fn test_missing_file_is_configuration_error() {
        let err = ConfigurationBuilder::new()
            .properties_file("/definitely/not/here.properties")
            .unwrap_err();
        assert!(matches!(err, MetaError::Configuration(_)));
    }
}
