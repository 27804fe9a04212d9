//! Output path interpretation

use super::MaterializeError;

/// Placeholder replaced by a per-element fragment in split mode
pub const PLACEHOLDER: &str = "%s";

/// Serialization format of an output file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Yaml,
}

impl Format {
    /// YAML for `.yml`/`.yaml` paths, JSON otherwise
    pub fn from_path(path: &str) -> Self {
        if path.ends_with(".yml") || path.ends_with(".yaml") {
            Format::Yaml
        } else {
            Format::Json
        }
    }
}

/// Where and how one instance is written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputTarget {
    pub pattern: String,
    pub format: Format,
    /// One file per list element instead of a single file
    pub split: bool,
}

impl OutputTarget {
    pub fn parse(output: &str) -> Result<Self, MaterializeError> {
        let placeholders = output.matches(PLACEHOLDER).count();
        if placeholders > 1 {
            return Err(MaterializeError::Split(format!(
                "output \"{}\" has {} \"{}\" placeholders, expected at most one",
                output, placeholders, PLACEHOLDER
            )));
        }
        Ok(Self {
            pattern: output.to_string(),
            format: Format::from_path(output),
            split: placeholders == 1,
        })
    }

    /// Path of one split element
    pub fn expand(&self, fragment: &str) -> String {
        self.pattern.replacen(PLACEHOLDER, fragment, 1)
    }
}

/// Filename fragment for the list element at `index`: `{index:05}-{name}-{kind}`
///
/// `name` comes from `metadata.name`, falling back to a top-level `name`;
/// `kind` is lower-cased. Missing values leave their part empty.
pub fn fragment(index: usize, item: &serde_json::Value) -> String {
    let name = item
        .pointer("/metadata/name")
        .and_then(|v| v.as_str())
        .or_else(|| item.get("name").and_then(|v| v.as_str()))
        .unwrap_or("");
    let kind = item
        .get("kind")
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_lowercase();
    format!("{:05}-{}-{}", index, name, kind)
}
