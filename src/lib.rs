//! kue - generate manifest files from constraint-language templates
//!
//! A directory of module files is compiled into one validated value. The
//! value's `template` slot is then instantiated once per instance descriptor,
//! with the descriptor's parameters bound to the `parameters` slot, and the
//! result is written as JSON or YAML.
//!
//! # Example
//!
//! ```rust
//! use kue::{render_instance, Evaluator, InstanceDescriptor, Materializer, Parameters};
//!
//! let mut evaluator = Evaluator::new();
//! let root = evaluator
//!     .compile_str("app.cue", r#"
//!         parameters: { name: string }
//!         template: { kind: "Service", metadata: name: parameters.name }
//!     "#)
//!     .unwrap();
//!
//! let out = tempfile::tempdir().unwrap();
//! let instance = InstanceDescriptor {
//!     output: "svc.json".to_string(),
//!     parameters: Parameters::from_json(r#"{"name": "web"}"#).unwrap(),
//! };
//! let written = render_instance(&root, &instance, &Materializer::new(out.path())).unwrap();
//! assert_eq!(written, vec![out.path().join("svc.json")]);
//! ```

pub mod config;
pub mod error;
pub mod eval;
pub mod instance;
pub mod output;
pub mod parser;
pub mod template;

pub use config::{ConfigError, GenerateConfig};
pub use error::CompileError;
pub use eval::{BuildError, Evaluator, TemplateValue, Value};
pub use instance::{InstanceDescriptor, InstanceError, InstanceSource};
pub use output::{Format, MaterializeError, Materializer, OutputTarget};
pub use template::{extract_json, fill, Bindable, ExtractError, FillError, Parameters};

use std::path::PathBuf;

use log::debug;
use thiserror::Error;

use template::{PARAMETERS_SLOT, TEMPLATE_SLOT};

/// Errors that can occur while rendering one instance
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("fill error: {0}")]
    Fill(#[from] FillError),

    #[error("extract error: {0}")]
    Extract(#[from] ExtractError),

    #[error(transparent)]
    Materialize(#[from] MaterializeError),
}

/// Errors that can occur during a generation run
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error("instance error: {0}")]
    Instance(#[from] InstanceError),

    #[error("instance {index} (output \"{output}\"): {source}")]
    Render {
        index: usize,
        output: String,
        #[source]
        source: RenderError,
    },
}

impl GenerateError {
    /// Describe the error, with source context where the evaluator has it
    pub fn render(&self, evaluator: &Evaluator) -> String {
        match self {
            GenerateError::Build(err) => evaluator.render(err),
            GenerateError::Render {
                source: RenderError::Fill(FillError::Conflict { conflict, .. }),
                ..
            } => evaluator
                .render_conflict(&self.to_string(), conflict)
                .unwrap_or_else(|| self.to_string()),
            _ => self.to_string(),
        }
    }
}

/// Fill, extract and write one instance
pub fn render_instance(
    root: &TemplateValue,
    instance: &InstanceDescriptor,
    materializer: &Materializer,
) -> Result<Vec<PathBuf>, RenderError> {
    let resolved = fill(root, PARAMETERS_SLOT, &instance.parameters)?;
    let bytes = extract_json(&resolved, TEMPLATE_SLOT)?;
    Ok(materializer.materialize(&instance.output, &bytes)?)
}

/// Run the whole pipeline: load, resolve instances, render each in order
///
/// Stops at the first error; files written for earlier instances stay on disk.
/// Returns every written path.
pub fn generate(
    evaluator: &mut Evaluator,
    config: &GenerateConfig,
) -> Result<Vec<PathBuf>, GenerateError> {
    let root = evaluator.build_all(&config.input_directory)?;

    let source = InstanceSource::detect(&config.input_directory);
    let instances = source.load(&root)?;
    debug!("rendering {} instance(s)", instances.len());

    let materializer =
        Materializer::new(&config.output_directory).with_pretty_json(config.pretty_json);

    let mut written = Vec::new();
    for (index, instance) in instances.iter().enumerate() {
        let paths = render_instance(&root, instance, &materializer).map_err(|source| {
            GenerateError::Render {
                index,
                output: instance.output.clone(),
                source,
            }
        })?;
        written.extend(paths);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn workspace(files: &[(&str, &str)]) -> (TempDir, GenerateConfig) {
        let dir = TempDir::new().expect("tempdir");
        let input = dir.path().join("in");
        fs::create_dir(&input).expect("mkdir");
        for (name, content) in files {
            fs::write(input.join(name), content).expect("write");
        }
        let config = GenerateConfig::new()
            .with_input_directory(input)
            .with_output_directory(dir.path().join("out"));
        (dir, config)
    }

    #[test]
    fn test_generate_embedded_instances() {
        let (_dir, config) = workspace(&[(
            "app.cue",
            r#"
            parameters: { name: string }
            template: { name: parameters.name }
            instances: [
                { output: "a.json", parameters: { name: "a" } },
                { output: "b.json", parameters: { name: "b" } },
            ]
            "#,
        )]);

        let written = generate(&mut Evaluator::new(), &config).expect("generate");
        assert_eq!(
            written,
            vec![
                config.output_directory.join("a.json"),
                config.output_directory.join("b.json"),
            ]
        );
    }

    #[test]
    fn test_generate_reports_failing_instance() {
        let (_dir, config) = workspace(&[
            ("app.cue", "parameters: { replicas: int }\ntemplate: { r: parameters.replicas }"),
            (
                "instances.json",
                r#"{"instances": [{"parameters": {"replicas": 1}, "output": "ok.json"}, {"parameters": {"replicas": "x"}, "output": "bad.json"}]}"#,
            ),
        ]);

        let mut evaluator = Evaluator::new();
        let err = generate(&mut evaluator, &config).unwrap_err();
        match &err {
            GenerateError::Render { index, output, .. } => {
                assert_eq!(*index, 1);
                assert_eq!(output, "bad.json");
            }
            other => panic!("unexpected error: {}", other),
        }
        assert!(config.output_directory.join("ok.json").exists());
        assert!(!config.output_directory.join("bad.json").exists());
        assert!(err.render(&evaluator).contains("bad.json"));
    }

    #[test]
    fn test_generate_build_error() {
        let (_dir, config) = workspace(&[("app.cue", "template: {")]);
        let err = generate(&mut Evaluator::new(), &config).unwrap_err();
        assert!(matches!(err, GenerateError::Build(BuildError::Compile { .. })));
    }
}
