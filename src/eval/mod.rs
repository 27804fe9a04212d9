//! Evaluation of module files into values
//!
//! The [`Evaluator`] owns every source text it has loaded so diagnostics can
//! point back into them. Loading takes the evaluator by `&mut`, which keeps
//! at most one load in flight per evaluator.

mod engine;
pub mod export;
pub mod ops;
pub mod unify;
pub mod value;

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::debug;
use thiserror::Error;

use crate::error::{render_report, CompileError};
use crate::parser::{parse, File};

pub use export::{to_json, Unresolved};
pub use value::{Conflict, FileId, SourceSpan, Value};

/// File extension of module files
pub const MODULE_EXTENSION: &str = "cue";

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("failed to read {}: {source}", .path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to compile {}: {}", .path.display(), summarize(.errors))]
    Compile {
        path: PathBuf,
        errors: Vec<CompileError>,
    },

    #[error("failed to merge modules in {}: {message}", .dir.display())]
    Merge { dir: PathBuf, message: String },

    #[error("validation failed at {}: {conflict}", display_path(.path))]
    Validation { path: String, conflict: Conflict },
}

fn summarize(errors: &[CompileError]) -> String {
    match errors {
        [] => "unknown error".to_string(),
        [only] => only.to_string(),
        [first, rest @ ..] => format!("{} (and {} more)", first, rest.len()),
    }
}

fn display_path(path: &str) -> &str {
    if path.is_empty() {
        "<root>"
    } else {
        path
    }
}

/// A loaded module file
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: PathBuf,
    pub text: String,
}

#[derive(Debug)]
struct Module {
    id: FileId,
    ast: File,
}

/// The parsed files making up one package
#[derive(Debug)]
struct Program {
    modules: Vec<Module>,
}

/// An evaluated package, possibly with values filled in
///
/// Cloning is cheap: the parsed program is shared, and filling never touches
/// the value it is called on.
#[derive(Debug, Clone)]
pub struct TemplateValue {
    program: Arc<Program>,
    fills: Vec<Value>,
    value: Value,
}

impl TemplateValue {
    fn new(program: Arc<Program>, fills: Vec<Value>) -> Self {
        let value = {
            let files: Vec<(FileId, &File)> = program
                .modules
                .iter()
                .map(|m| (m.id, &m.ast))
                .collect();
            engine::evaluate(&files, &fills)
        };
        Self {
            program,
            fills,
            value,
        }
    }

    /// The evaluated root value
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Look up a dotted path in the root value
    pub fn lookup(&self, path: &str) -> Option<&Value> {
        self.value.lookup(path)
    }

    /// Re-evaluate the program with one more value unified into the root
    pub fn unify(&self, value: Value) -> TemplateValue {
        let mut fills = self.fills.clone();
        fills.push(value);
        TemplateValue::new(Arc::clone(&self.program), fills)
    }

    /// First conflict anywhere in the value, with its path
    pub fn first_conflict(&self) -> Option<(String, &Conflict)> {
        self.value.first_conflict()
    }

    fn validate(&self) -> Result<(), BuildError> {
        match self.first_conflict() {
            Some((path, conflict)) => Err(BuildError::Validation {
                path,
                conflict: conflict.clone(),
            }),
            None => Ok(()),
        }
    }
}

impl PartialEq for TemplateValue {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

/// Stateful evaluation context
#[derive(Debug, Default)]
pub struct Evaluator {
    sources: Vec<SourceFile>,
}

impl Evaluator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Source text of a loaded file
    pub fn source(&self, id: FileId) -> Option<&SourceFile> {
        self.sources.get(id)
    }

    fn register(&mut self, path: PathBuf, text: String) -> FileId {
        self.sources.push(SourceFile { path, text });
        self.sources.len() - 1
    }

    fn parse_module(&mut self, path: PathBuf, text: String) -> Result<Module, BuildError> {
        let ast = parse(&text);
        let id = self.register(path.clone(), text);
        let ast = ast.map_err(|errors| BuildError::Compile { path, errors })?;
        Ok(Module { id, ast })
    }

    /// Compile module source held in memory
    pub fn compile_str(
        &mut self,
        name: impl Into<PathBuf>,
        text: &str,
    ) -> Result<TemplateValue, BuildError> {
        let module = self.parse_module(name.into(), text.to_string())?;
        Ok(TemplateValue::new(
            Arc::new(Program {
                modules: vec![module],
            }),
            Vec::new(),
        ))
    }

    /// Compile a single module file
    pub fn compile_file(&mut self, path: &Path) -> Result<TemplateValue, BuildError> {
        let text = read_module(path)?;
        self.compile_str(path, &text)
    }

    /// Load every module file in `dir`, merge them into one value and validate it
    pub fn build_all(&mut self, dir: &Path) -> Result<TemplateValue, BuildError> {
        let paths = module_files(dir)?;
        if paths.is_empty() {
            return Err(BuildError::Merge {
                dir: dir.to_path_buf(),
                message: format!("no .{} files found", MODULE_EXTENSION),
            });
        }

        let mut modules = Vec::with_capacity(paths.len());
        for path in paths {
            debug!("loading module {}", path.display());
            let text = read_module(&path)?;
            modules.push(self.parse_module(path, text)?);
        }

        let packages: BTreeSet<&str> = modules.iter().map(|m| m.ast.package_name()).collect();
        if packages.len() != 1 {
            let names: Vec<&str> = packages
                .iter()
                .map(|p| if p.is_empty() { "<none>" } else { *p })
                .collect();
            return Err(BuildError::Merge {
                dir: dir.to_path_buf(),
                message: format!(
                    "expected exactly one package, found {} ({})",
                    names.len(),
                    names.join(", ")
                ),
            });
        }

        let root = TemplateValue::new(Arc::new(Program { modules }), Vec::new());
        root.validate()?;
        Ok(root)
    }

    /// Render a conflict with source context, if its location is known
    pub fn render_conflict(&self, title: &str, conflict: &Conflict) -> Option<String> {
        let span = conflict.span.as_ref()?;
        let source = self.source(span.file)?;
        let filename = source.path.display().to_string();
        Some(render_report(
            &source.text,
            &filename,
            span.span.clone(),
            title,
            &conflict.message,
        ))
    }

    /// Render a build error, with source context where available
    pub fn render(&self, err: &BuildError) -> String {
        match err {
            BuildError::Compile { path, errors } => {
                let source = self
                    .sources
                    .iter()
                    .rev()
                    .find(|s| &s.path == path)
                    .map(|s| s.text.as_str());
                match source {
                    Some(text) => {
                        let filename = path.display().to_string();
                        errors
                            .iter()
                            .map(|e| e.format(text, &filename))
                            .collect::<Vec<_>>()
                            .join("\n")
                    }
                    None => err.to_string(),
                }
            }
            BuildError::Validation { conflict, .. } => self
                .render_conflict(&err.to_string(), conflict)
                .unwrap_or_else(|| err.to_string()),
            _ => err.to_string(),
        }
    }
}

fn read_module(path: &Path) -> Result<String, BuildError> {
    fs::read_to_string(path).map_err(|source| BuildError::Load {
        path: path.to_path_buf(),
        source,
    })
}

/// Module files directly inside `dir`, in file-name order
fn module_files(dir: &Path) -> Result<Vec<PathBuf>, BuildError> {
    let load_error = |source| BuildError::Load {
        path: dir.to_path_buf(),
        source,
    };
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir).map_err(load_error)? {
        let entry = entry.map_err(load_error)?;
        let path = entry.path();
        let is_file = fs::metadata(&path).map(|m| m.is_file()).unwrap_or(false);
        if is_file && path.extension().is_some_and(|ext| ext == MODULE_EXTENSION) {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}
