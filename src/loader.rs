/// Load orchestration: collect-then-validate per configuration source
///
/// A source's load runs NotStarted → Evaluating → Validating → Done | Failed.
/// Evaluation collects every raw record the script declares; validation then
/// judges them in order. One bad record fails the whole source; no workflow
/// from a failing source is ever registered. Directory loads isolate failures
/// per file while enforcing id uniqueness across the whole pass.

use crate::config::LoaderConfig;
use crate::error::{ConfigError, SourceError};
use crate::script::builders::PrimitiveRegistry;
use crate::script::engine::evaluate_source;
use crate::workflow::builder::build_workflow;
use crate::workflow::types::{Configuration, Workflow};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// The workflow definition loader.
///
/// Owns the immutable primitive registry; holds no state across load calls,
/// so independent sources may be loaded concurrently from separate loaders.
#[derive(Debug)]
pub struct Loader {
    config: LoaderConfig,
    registry: PrimitiveRegistry,
}

/// Result of a directory load: the combined configuration from every clean
/// source, plus the errors of the failing ones.
#[derive(Debug, Default)]
pub struct DirectoryLoad {
    pub configuration: Configuration,
    pub errors: Vec<SourceError>,
}

impl Loader {
    pub fn new(config: LoaderConfig) -> Self {
        let registry = PrimitiveRegistry::new(config.default_fs.clone());
        Self { config, registry }
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    pub fn registry(&self) -> &PrimitiveRegistry {
        &self.registry
    }

    /// Load one configuration source with an empty uniqueness scope.
    pub fn load(&self, source_id: &str, source: &str) -> Result<Vec<Workflow>, SourceError> {
        self.load_source(source_id, source, &HashSet::new())
    }

    /// Load one configuration source against a pre-existing id set.
    ///
    /// Returns the workflows in `addWorkflow` call order, or everything that
    /// is wrong with the source. All-or-nothing: a single bad record means
    /// zero workflows from this source.
    pub fn load_source(
        &self,
        source_id: &str,
        source: &str,
        known_ids: &HashSet<String>,
    ) -> Result<Vec<Workflow>, SourceError> {
        let records = evaluate_source(&self.registry, source_id, source)
            .map_err(|e| SourceError::single(source_id, e))?;

        let mut accepted = known_ids.clone();
        let mut workflows = Vec::new();
        let mut errors = Vec::new();
        for raw in records {
            match build_workflow(raw, &accepted) {
                Ok(workflow) => {
                    accepted.insert(workflow.id.clone());
                    workflows.push(workflow);
                }
                // Keep validating the remaining records so the report covers
                // the whole source, not just the first bad record.
                Err(mut defects) => errors.append(&mut defects),
            }
        }

        if !errors.is_empty() {
            return Err(SourceError::new(source_id, errors));
        }
        tracing::info!(
            "✅ Loaded {} workflow(s) from source '{}'",
            workflows.len(),
            source_id
        );
        Ok(workflows)
    }

    /// Load every `*.lua` source in `dir`, in file-name order.
    ///
    /// A failing file is reported without aborting its siblings; workflow ids
    /// must be unique across the whole directory pass, and a collision fails
    /// the later file.
    pub fn load_directory(&self, dir: &Path) -> DirectoryLoad {
        let mut load = DirectoryLoad::default();
        let mut accepted: HashSet<String> = HashSet::new();

        for path in lua_sources(dir, &mut load.errors) {
            let source_id = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| path.display().to_string());
            let source = match std::fs::read_to_string(&path) {
                Ok(text) => text,
                Err(e) => {
                    load.errors.push(SourceError::single(
                        &source_id,
                        ConfigError::Io {
                            path: path.display().to_string(),
                            message: e.to_string(),
                        },
                    ));
                    continue;
                }
            };
            match self.load_source(&source_id, &source, &accepted) {
                Ok(workflows) => {
                    for workflow in workflows {
                        accepted.insert(workflow.id.clone());
                        load.configuration.add(workflow);
                    }
                }
                Err(error) => {
                    tracing::error!("❌ Failed to load workflow source '{}': {}", source_id, error);
                    load.errors.push(error);
                }
            }
        }

        tracing::info!(
            "📥 Loaded {} workflow(s) from {} ({} failing source(s))",
            load.configuration.len(),
            dir.display(),
            load.errors.len()
        );
        load
    }
}

fn lua_sources(dir: &Path, errors: &mut Vec<SourceError>) -> Vec<PathBuf> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            errors.push(SourceError::single(
                dir.display().to_string(),
                ConfigError::Io {
                    path: dir.display().to_string(),
                    message: e.to_string(),
                },
            ));
            return Vec::new();
        }
    };
    let mut paths: Vec<PathBuf> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file() && path.extension().and_then(|e| e.to_str()) == Some("lua")
        })
        .collect();
    paths.sort();
    paths
}
