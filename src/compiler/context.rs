//! Shared state for a pipeline run over many functions.

use dashmap::DashMap;

use crate::{
    analysis::Graph,
    compiler::{config::OptimizerConfig, events::EventLog},
};

/// Compiler context shared by every pass of a pipeline run.
///
/// Holds the control-flow graph of each function by name, the configuration
/// and the accumulated [`EventLog`]. All fields are safe to use from several
/// rayon workers at once; a worker takes a graph out of `functions` while it
/// transforms it and puts it back afterwards.
#[derive(Debug, Default)]
pub struct CompilerContext {
    /// Control-flow graph of each function, keyed by name.
    pub functions: DashMap<String, Graph>,

    /// Accumulated events from all passes.
    pub events: EventLog,

    /// Pipeline configuration (for pass-specific thresholds).
    pub config: OptimizerConfig,
}

impl CompilerContext {
    /// Creates an empty context with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty context with the given configuration.
    #[must_use]
    pub fn with_config(config: OptimizerConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Adds or replaces the graph of `name`.
    pub fn add_function(&self, name: impl Into<String>, graph: Graph) {
        self.functions.insert(name.into(), graph);
    }

    /// Removes and returns the graph of `name`.
    pub fn take_function(&self, name: &str) -> Option<Graph> {
        self.functions.remove(name).map(|(_, g)| g)
    }

    /// Returns a copy of the graph of `name`.
    #[must_use]
    pub fn function(&self, name: &str) -> Option<Graph> {
        self.functions.get(name).map(|g| g.clone())
    }

    /// Names of all functions, sorted.
    #[must_use]
    pub fn function_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.functions.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Number of functions in the context.
    #[must_use]
    pub fn function_count(&self) -> usize {
        self.functions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_function_storage() {
        let ctx = CompilerContext::new();
        let mut graph = Graph::new();
        let ret = graph.add_return();
        graph.add_start(ret).unwrap();

        ctx.add_function("b", graph.clone());
        ctx.add_function("a", graph);
        assert_eq!(ctx.function_names(), vec!["a", "b"]);
        assert_eq!(ctx.function("a").map(|g| g.node_count()), Some(2));

        assert!(ctx.take_function("a").is_some());
        assert_eq!(ctx.function_count(), 1);
        assert!(ctx.take_function("a").is_none());
    }
}
