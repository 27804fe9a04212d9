//! Writing extracted documents to disk

mod target;

pub use target::{fragment, Format, OutputTarget, PLACEHOLDER};

use std::fs;
use std::path::{Component, Path, PathBuf};

use log::info;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MaterializeError {
    #[error("split error: {0}")]
    Split(String),

    #[error("failed to decode extracted document: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("failed to encode {} as JSON: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode {} as YAML: {source}", .path.display())]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("failed to write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Writes documents below an output directory
#[derive(Debug, Clone)]
pub struct Materializer {
    output_directory: PathBuf,
    pretty_json: bool,
}

impl Materializer {
    pub fn new(output_directory: impl Into<PathBuf>) -> Self {
        Self {
            output_directory: output_directory.into(),
            pretty_json: true,
        }
    }

    /// Indent JSON output (on by default)
    pub fn with_pretty_json(mut self, pretty: bool) -> Self {
        self.pretty_json = pretty;
        self
    }

    /// Write extracted JSON bytes to the file(s) named by `output`
    ///
    /// Returns the written paths in order.
    pub fn materialize(&self, output: &str, bytes: &[u8]) -> Result<Vec<PathBuf>, MaterializeError> {
        let target = OutputTarget::parse(output)?;
        let document: serde_json::Value =
            serde_json::from_slice(bytes).map_err(MaterializeError::Decode)?;

        if !target.split {
            return Ok(vec![self.write(&target.pattern, target.format, &document)?]);
        }

        let items = split_items(&document).ok_or_else(|| {
            MaterializeError::Split(format!(
                "output \"{}\" requires the template to be a list, got {}",
                output,
                type_name(&document)
            ))
        })?;

        let mut written = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            if !item.is_object() {
                return Err(MaterializeError::Split(format!(
                    "element {} of \"{}\" is {}, expected an object",
                    index,
                    output,
                    type_name(item)
                )));
            }
            let path = target.expand(&fragment(index, item));
            written.push(self.write(&path, target.format, item)?);
        }
        Ok(written)
    }

    fn write(
        &self,
        relative: &str,
        format: Format,
        document: &serde_json::Value,
    ) -> Result<PathBuf, MaterializeError> {
        let path = nest(&self.output_directory, relative);
        let content = self.encode(&path, format, document)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| MaterializeError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        info!("writing {}", path.display());
        fs::write(&path, content).map_err(|source| MaterializeError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }

    fn encode(
        &self,
        path: &Path,
        format: Format,
        document: &serde_json::Value,
    ) -> Result<String, MaterializeError> {
        match format {
            Format::Yaml => serde_yaml::to_string(document).map_err(|source| MaterializeError::Yaml {
                path: path.to_path_buf(),
                source,
            }),
            Format::Json => {
                let encoded = if self.pretty_json {
                    serde_json::to_string_pretty(document)
                } else {
                    serde_json::to_string(document)
                };
                encoded.map_err(|source| MaterializeError::Json {
                    path: path.to_path_buf(),
                    source,
                })
            }
        }
    }
}

/// `base` joined with `relative`; roots and prefixes are dropped so the result stays below `base`
fn nest(base: &Path, relative: &str) -> PathBuf {
    let mut path = base.to_path_buf();
    for component in Path::new(relative).components() {
        match component {
            Component::Normal(part) => path.push(part),
            Component::ParentDir => path.push(".."),
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
        }
    }
    path
}

/// A JSON array, or the `items` of a Kubernetes-style list object
fn split_items(document: &serde_json::Value) -> Option<&Vec<serde_json::Value>> {
    match document {
        serde_json::Value::Array(items) => Some(items),
        serde_json::Value::Object(map) => map.get("items").and_then(|items| items.as_array()),
        _ => None,
    }
}

fn type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a bool",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "a list",
        serde_json::Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tempfile::TempDir;

    fn bytes(value: serde_json::Value) -> Vec<u8> {
        serde_json::to_vec(&value).expect("encode")
    }

    #[test]
    fn test_single_json_file_is_pretty() {
        let dir = TempDir::new().expect("tempdir");
        let materializer = Materializer::new(dir.path());
        let written = materializer
            .materialize("nested/a.json", &bytes(json!({"a": 1})))
            .expect("materialize");

        assert_eq!(written, vec![dir.path().join("nested/a.json")]);
        let content = fs::read_to_string(&written[0]).expect("read");
        assert_eq!(content, "{\n  \"a\": 1\n}");
    }

    #[test]
    fn test_absolute_output_stays_below_output_directory() {
        let dir = TempDir::new().expect("tempdir");
        let materializer = Materializer::new(dir.path());
        let written = materializer
            .materialize("/nested/abs.json", &bytes(json!({"a": 1})))
            .expect("materialize");
        assert_eq!(written, vec![dir.path().join("nested/abs.json")]);
        assert!(written[0].exists());

        let written = materializer
            .materialize("/split/%s.json", &bytes(json!([{"kind": "A", "name": "n1"}])))
            .expect("materialize");
        assert_eq!(written, vec![dir.path().join("split/00000-n1-a.json")]);
    }

    #[test]
    fn test_compact_json() {
        let dir = TempDir::new().expect("tempdir");
        let materializer = Materializer::new(dir.path()).with_pretty_json(false);
        let written = materializer
            .materialize("a.json", &bytes(json!({"b": [1, 2], "a": true})))
            .expect("materialize");
        let content = fs::read_to_string(&written[0]).expect("read");
        assert_eq!(content, r#"{"a":true,"b":[1,2]}"#);
    }

    #[test]
    fn test_yaml_file() {
        let dir = TempDir::new().expect("tempdir");
        let materializer = Materializer::new(dir.path());
        let written = materializer
            .materialize("a.yaml", &bytes(json!({"name": "web", "replicas": 2})))
            .expect("materialize");
        let content = fs::read_to_string(&written[0]).expect("read");
        let parsed: serde_json::Value = serde_yaml::from_str(&content).expect("yaml");
        assert_eq!(parsed, json!({"name": "web", "replicas": 2}));
    }

    #[test]
    fn test_overwrites_existing_file() {
        let dir = TempDir::new().expect("tempdir");
        fs::write(dir.path().join("a.json"), "old").expect("write");
        let materializer = Materializer::new(dir.path()).with_pretty_json(false);
        materializer
            .materialize("a.json", &bytes(json!({"new": 1})))
            .expect("materialize");
        let content = fs::read_to_string(dir.path().join("a.json")).expect("read");
        assert_eq!(content, r#"{"new":1}"#);
    }

    #[test]
    fn test_split_list() {
        let dir = TempDir::new().expect("tempdir");
        let materializer = Materializer::new(dir.path());
        let written = materializer
            .materialize(
                "out/%s.yaml",
                &bytes(json!([{"kind": "A", "name": "n1"}, {"kind": "B", "name": "n2"}])),
            )
            .expect("materialize");

        assert_eq!(
            written,
            vec![
                dir.path().join("out/00000-n1-a.yaml"),
                dir.path().join("out/00001-n2-b.yaml"),
            ]
        );
        let second: serde_json::Value =
            serde_yaml::from_str(&fs::read_to_string(&written[1]).expect("read")).expect("yaml");
        assert_eq!(second, json!({"kind": "B", "name": "n2"}));
    }

    #[test]
    fn test_split_kubernetes_list_object() {
        let dir = TempDir::new().expect("tempdir");
        let materializer = Materializer::new(dir.path());
        let document = json!({
            "kind": "List",
            "items": [{"kind": "Service", "metadata": {"name": "web"}}]
        });
        let written = materializer
            .materialize("%s.json", &bytes(document))
            .expect("materialize");
        assert_eq!(written, vec![dir.path().join("00000-web-service.json")]);
    }

    #[test]
    fn test_split_requires_list() {
        let dir = TempDir::new().expect("tempdir");
        let materializer = Materializer::new(dir.path());
        let err = materializer
            .materialize("%s.json", &bytes(json!({"a": 1})))
            .unwrap_err();
        assert!(matches!(err, MaterializeError::Split(_)));
        assert!(fs::read_dir(dir.path()).expect("read_dir").next().is_none());
    }

    #[test]
    fn test_split_rejects_scalar_elements() {
        let dir = TempDir::new().expect("tempdir");
        let materializer = Materializer::new(dir.path());
        let err = materializer
            .materialize("%s.json", &bytes(json!([1, 2])))
            .unwrap_err();
        assert!(matches!(err, MaterializeError::Split(_)));
    }
}
