/// Hot-reload workflow registry using ArcSwap
///
/// Holds the latest successfully loaded configuration behind an atomic
/// pointer. Reloading re-runs the directory load and swaps the whole
/// configuration in one store, so concurrent readers (the scheduler stepping
/// through slots) are never blocked and never observe a half-loaded state.

use crate::error::SourceError;
use crate::loader::Loader;
use crate::workflow::types::{Configuration, Workflow};
use arc_swap::ArcSwap;
use std::sync::Arc;

/// Lock-free registry over the loader's configured workflows directory.
#[derive(Debug)]
pub struct WorkflowRegistry {
    loader: Loader,
    current: ArcSwap<Configuration>,
}

impl WorkflowRegistry {
    /// Create an empty registry; call `reload` to populate it.
    pub fn new(loader: Loader) -> Self {
        Self {
            loader,
            current: ArcSwap::from_pointee(Configuration::default()),
        }
    }

    /// Re-run the directory load and atomically publish the result.
    ///
    /// Sources that fail are reported and simply absent from the published
    /// configuration; clean sources always win.
    pub fn reload(&self) -> Vec<SourceError> {
        let dir = self.loader.config().workflows_dir.clone();
        let load = self.loader.load_directory(&dir);
        self.current.store(Arc::new(load.configuration));
        tracing::info!(
            "🔄 Workflow registry now serves {} workflow(s)",
            self.current.load().len()
        );
        load.errors
    }

    /// The latest published configuration (lock-free read).
    pub fn configuration(&self) -> Arc<Configuration> {
        self.current.load_full()
    }

    /// Look up one workflow by id in the latest configuration.
    pub fn get_workflow(&self, id: &str) -> Option<Workflow> {
        self.current.load().get(id).cloned()
    }

    /// Ids of all currently registered workflows, in registration order.
    pub fn workflow_ids(&self) -> Vec<String> {
        self.current.load().ids().map(str::to_string).collect()
    }
}
