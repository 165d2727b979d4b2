//! Writer configuration.
//!
//! Keys use the flat kebab-case names of the writer properties
//! (`template-relevance-threshold`, `engine-prefix`, …). A configuration can
//! be deserialized from TOML or assembled from already-split key/value pairs
//! with [`WriterConfig::set`].

use serde::{Deserialize, Serialize};

use crate::error::{CtmError, Result};

/// Feature switches and tuning knobs of one [`crate::CtmWriter`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct WriterConfig {
    /// Emit item identifiers as `^ <iri>` lines in topic blocks.
    pub export_item_identifiers: bool,
    /// Detect namespace prefixes from the graph's subject IRIs.
    pub prefix_auto_detect: bool,
    /// Mine templates from the graph.
    pub template_auto_detect: bool,
    /// Mine topic templates (requires `template-auto-detect`).
    pub template_detect_topics: bool,
    /// Mine association templates (requires `template-auto-detect`).
    pub template_detect_associations: bool,
    /// Minimum share of instances (0.0–1.0) that must carry a pattern before
    /// it becomes a template entry.
    pub template_relevance_threshold: f64,
    /// Write `def … end` blocks for templates.
    pub template_export: bool,
    /// Template names never written as definitions.
    pub template_export_exclude: Vec<String>,
    /// Factor entries shared between templates into sub-templates.
    pub template_merge: bool,
    /// Minimum entry count of a shared subset before it is factored out.
    pub template_merge_threshold: usize,
    /// Largest entry subset the merger enumerates. `None` enumerates the full
    /// power set, which is exponential in a template's entry count.
    pub template_merge_max_subset_size: Option<usize>,
    /// IRI prefix of engine-assigned ("system") item identifiers.
    pub engine_prefix: Option<String>,
    /// Document base IRI; item identifiers `<base>#id` are written as `id`.
    pub base_iri: Option<String>,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            export_item_identifiers: false,
            prefix_auto_detect: true,
            template_auto_detect: false,
            template_detect_topics: true,
            template_detect_associations: true,
            template_relevance_threshold: 0.8,
            template_export: true,
            template_export_exclude: Vec::new(),
            template_merge: false,
            template_merge_threshold: 2,
            template_merge_max_subset_size: None,
            engine_prefix: None,
            base_iri: None,
        }
    }
}

impl WriterConfig {
    /// Parses a TOML document and validates the result.
    ///
    /// # Errors
    ///
    /// Returns [`CtmError::InvalidConfig`] if the document does not parse or a
    /// value is out of range.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: WriterConfig = toml::from_str(source).map_err(|e| CtmError::InvalidConfig {
            key: "<document>".to_owned(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Sets one property from its flat key and textual value.
    ///
    /// List values (`template-export-exclude`) are comma-separated; an empty
    /// value clears optional properties.
    ///
    /// # Errors
    ///
    /// Returns [`CtmError::InvalidConfig`] for unknown keys and unparsable or
    /// out-of-range values.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let value = value.trim();
        match key {
            "export-item-identifiers" => self.export_item_identifiers = parse_bool(key, value)?,
            "prefix-auto-detect" => self.prefix_auto_detect = parse_bool(key, value)?,
            "template-auto-detect" => self.template_auto_detect = parse_bool(key, value)?,
            "template-detect-topics" => self.template_detect_topics = parse_bool(key, value)?,
            "template-detect-associations" => {
                self.template_detect_associations = parse_bool(key, value)?;
            }
            "template-relevance-threshold" => {
                self.template_relevance_threshold =
                    value.parse().map_err(|_| invalid(key, "expected a number"))?;
            }
            "template-export" => self.template_export = parse_bool(key, value)?,
            "template-export-exclude" => {
                self.template_export_exclude = value
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_owned)
                    .collect();
            }
            "template-merge" => self.template_merge = parse_bool(key, value)?,
            "template-merge-threshold" => {
                self.template_merge_threshold = value
                    .parse()
                    .map_err(|_| invalid(key, "expected a non-negative integer"))?;
            }
            "template-merge-max-subset-size" => {
                self.template_merge_max_subset_size = if value.is_empty() {
                    None
                } else {
                    Some(
                        value
                            .parse()
                            .map_err(|_| invalid(key, "expected a non-negative integer"))?,
                    )
                };
            }
            "engine-prefix" => self.engine_prefix = non_empty(value),
            "base-iri" => self.base_iri = non_empty(value),
            _ => return Err(invalid(key, "unknown configuration key")),
        }
        self.validate()
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`CtmError::InvalidConfig`] if the relevance threshold is not
    /// within `[0, 1]` or the merge threshold is zero.
    pub fn validate(&self) -> Result<()> {
        let t = self.template_relevance_threshold;
        if !(0.0..=1.0).contains(&t) {
            return Err(invalid(
                "template-relevance-threshold",
                &format!("{t} is not within [0, 1]"),
            ));
        }
        if self.template_merge_threshold == 0 {
            return Err(invalid("template-merge-threshold", "must be at least 1"));
        }
        if self.template_merge_max_subset_size == Some(0) {
            return Err(invalid("template-merge-max-subset-size", "must be at least 1"));
        }
        Ok(())
    }

    /// Returns true if `name` must not be written as a template definition.
    #[must_use]
    pub fn is_export_excluded(&self, name: &str) -> bool {
        self.template_export_exclude.iter().any(|n| n == name)
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(invalid(key, &format!("'{value}' is not a boolean"))),
    }
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_owned())
}

fn invalid(key: &str, message: &str) -> CtmError {
    CtmError::InvalidConfig {
        key: key.to_owned(),
        message: message.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(WriterConfig::default().validate().is_ok());
    }

    #[test]
    fn set_flat_keys() {
        let mut config = WriterConfig::default();
        config.set("template-auto-detect", "true").expect("bool");
        config.set("template-relevance-threshold", "0.66").expect("float");
        config.set("template-export-exclude", "a, b,").expect("list");
        config.set("engine-prefix", "http://engine.local/").expect("string");
        assert!(config.template_auto_detect);
        assert!((config.template_relevance_threshold - 0.66).abs() < f64::EPSILON);
        assert_eq!(config.template_export_exclude, vec!["a", "b"]);
        assert_eq!(config.engine_prefix.as_deref(), Some("http://engine.local/"));
        assert!(config.is_export_excluded("a"));
    }

    #[test]
    fn rejects_out_of_range_threshold() {
        let mut config = WriterConfig::default();
        let err = config
            .set("template-relevance-threshold", "1.5")
            .expect_err("out of range");
        assert!(matches!(err, CtmError::InvalidConfig { .. }));
    }

    #[test]
    fn rejects_unknown_key() {
        let mut config = WriterConfig::default();
        assert!(config.set("no-such-key", "1").is_err());
    }

    #[test]
    fn parses_toml() {
        let config = WriterConfig::from_toml_str(
            "template-auto-detect = true\n\
             template-merge = true\n\
             template-merge-threshold = 3\n\
             base-iri = \"http://ex.org/map\"\n",
        )
        .expect("valid toml");
        assert!(config.template_merge);
        assert_eq!(config.template_merge_threshold, 3);
        assert_eq!(config.base_iri.as_deref(), Some("http://ex.org/map"));
        assert!(config.prefix_auto_detect);
    }

    #[test]
    fn toml_rejects_unknown_fields() {
        assert!(WriterConfig::from_toml_str("bogus = 1\n").is_err());
    }
}
