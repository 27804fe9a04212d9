//! Instance descriptors: which outputs to generate, with which parameters
//!
//! Descriptors come from one of two sources. An `instances.json` file in the
//! input directory always wins; otherwise the template's own `instances`
//! list is used.

use std::fs;
use std::path::{Path, PathBuf};

use log::debug;
use serde::Deserialize;
use thiserror::Error;

use crate::eval::{TemplateValue, Value};
use crate::template::Parameters;

/// Name of the external descriptor file
pub const DESCRIPTOR_FILE: &str = "instances.json";
/// Slot holding the embedded descriptor list
pub const INSTANCES_SLOT: &str = "instances";

/// One desired output
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceDescriptor {
    /// Output path relative to the output directory, possibly with a `%s` placeholder
    pub output: String,
    pub parameters: Parameters,
}

#[derive(Error, Debug)]
pub enum InstanceError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{0}")]
    Lookup(String),
}

/// Where descriptors are read from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstanceSource {
    External(PathBuf),
    Embedded,
}

impl InstanceSource {
    /// External mode if the descriptor file exists as a regular file
    pub fn detect(input_directory: &Path) -> Self {
        let path = input_directory.join(DESCRIPTOR_FILE);
        if path.is_file() {
            InstanceSource::External(path)
        } else {
            InstanceSource::Embedded
        }
    }

    pub fn load(&self, root: &TemplateValue) -> Result<Vec<InstanceDescriptor>, InstanceError> {
        match self {
            InstanceSource::External(path) => {
                debug!("reading instances from {}", path.display());
                load_external(path)
            }
            InstanceSource::Embedded => {
                debug!("reading instances from the \"{}\" slot", INSTANCES_SLOT);
                from_template(root)
            }
        }
    }
}

#[derive(Deserialize)]
struct DescriptorFile {
    instances: Vec<RawDescriptor>,
}

#[derive(Deserialize)]
struct RawDescriptor {
    parameters: serde_json::Map<String, serde_json::Value>,
    output: String,
}

/// Read descriptors from an `instances.json` file
pub fn load_external(path: &Path) -> Result<Vec<InstanceDescriptor>, InstanceError> {
    let content = fs::read_to_string(path).map_err(|source| InstanceError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_external(&content).map_err(|source| InstanceError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn parse_external(content: &str) -> Result<Vec<InstanceDescriptor>, serde_json::Error> {
    let file: DescriptorFile = serde_json::from_str(content)?;
    Ok(file
        .instances
        .into_iter()
        .map(|raw| InstanceDescriptor {
            output: raw.output,
            parameters: Parameters::Native(raw.parameters),
        })
        .collect())
}

/// Read descriptors from the template's `instances` list
pub fn from_template(root: &TemplateValue) -> Result<Vec<InstanceDescriptor>, InstanceError> {
    let slot = root.lookup(INSTANCES_SLOT).ok_or_else(|| {
        InstanceError::Lookup(format!(
            "no {} found and the template has no \"{}\" field",
            DESCRIPTOR_FILE, INSTANCES_SLOT
        ))
    })?;
    let elements = slot.as_list().ok_or_else(|| {
        InstanceError::Lookup(format!(
            "\"{}\" must be a list, got {}",
            INSTANCES_SLOT, slot
        ))
    })?;

    elements
        .iter()
        .enumerate()
        .map(|(i, element)| descriptor(i, element))
        .collect()
}

fn descriptor(index: usize, element: &Value) -> Result<InstanceDescriptor, InstanceError> {
    let field = |name: &str| {
        element.field(name).ok_or_else(|| {
            InstanceError::Lookup(format!("{}[{}]: missing field \"{}\"", INSTANCES_SLOT, index, name))
        })
    };

    let output = field("output")?;
    let output = output.as_str().ok_or_else(|| {
        InstanceError::Lookup(format!(
            "{}[{}].output: expected a concrete string, got {}",
            INSTANCES_SLOT, index, output
        ))
    })?;
    let parameters = field("parameters")?;

    Ok(InstanceDescriptor {
        output: output.to_string(),
        parameters: Parameters::Graph(parameters.clone()),
    })
}
