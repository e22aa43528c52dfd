//! Pass scheduler for orchestrating pass execution.
//!
//! The `PassScheduler` runs the optimization passes over every function in a
//! [`CompilerContext`] using a two-phase pipeline: structural transforms run
//! once, then cleanup passes run until they stop finding work.

use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;
use tracing::debug;

use crate::{
    compiler::{
        config::{OptimizerConfig, DEFAULT_CLEANUP_ITERATIONS},
        context::CompilerContext,
        pass::CfgPass,
        passes::{DeadCodeEliminationPass, LoopUnrollingPass},
    },
    Result,
};

/// Orchestrates pass execution in a phased pipeline.
///
/// 1. **Transform**: Structural rewrites such as loop unrolling, run once
/// 2. **Cleanup**: Dead code elimination, run to fixpoint
///
/// Cleanup is bounded by `max_cleanup_iterations`; a round that changes no
/// function ends the phase early.
pub struct PassScheduler {
    /// Maximum rounds of the cleanup phase.
    max_cleanup_iterations: usize,
    /// Phase 1: Structural transforms.
    pub transform: Vec<Box<dyn CfgPass>>,
    /// Phase 2: Cleanup passes, repeated until stable.
    pub cleanup: Vec<Box<dyn CfgPass>>,
}

impl Default for PassScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_CLEANUP_ITERATIONS)
    }
}

impl PassScheduler {
    /// Creates a new scheduler with no passes.
    ///
    /// # Arguments
    ///
    /// * `max_cleanup_iterations` - Maximum rounds of the cleanup phase.
    #[must_use]
    pub fn new(max_cleanup_iterations: usize) -> Self {
        Self {
            max_cleanup_iterations,
            transform: Vec::new(),
            cleanup: Vec::new(),
        }
    }

    /// Creates a scheduler with the built-in passes enabled by `config`.
    #[must_use]
    pub fn from_config(config: &OptimizerConfig) -> Self {
        let mut scheduler = Self::new(config.cleanup.max_iterations);
        if config.unroll.enabled {
            scheduler.transform.push(Box::new(LoopUnrollingPass::new()));
        }
        if config.cleanup.enabled {
            scheduler
                .cleanup
                .push(Box::new(DeadCodeEliminationPass::new()));
        }
        scheduler
    }

    /// Runs all passes once over all functions.
    ///
    /// Returns `true` if any pass made changes, `false` otherwise.
    ///
    /// Functions are processed in parallel using rayon. Each worker takes its
    /// function's graph out of the context, transforms it with no locks held,
    /// and puts it back before reporting the result.
    fn run_passes_once(ctx: &CompilerContext, passes: &mut [Box<dyn CfgPass>]) -> Result<bool> {
        let any_changed = AtomicBool::new(false);

        for pass in passes.iter_mut() {
            pass.initialize(ctx)?;
        }

        let functions = ctx.function_names();
        for pass in passes.iter() {
            functions.par_iter().try_for_each(|name| -> Result<()> {
                if !pass.should_run(name, ctx) {
                    return Ok(());
                }

                let Some(mut graph) = ctx.take_function(name) else {
                    return Ok(());
                };
                let result = pass.run_on_function(&mut graph, name, ctx);
                ctx.functions.insert(name.clone(), graph);

                if result? {
                    debug!(pass = pass.name(), function = %name, "pass changed function");
                    any_changed.store(true, Ordering::Relaxed);
                }
                Ok(())
            })?;
        }

        for pass in passes.iter_mut() {
            pass.finalize(ctx)?;
        }

        Ok(any_changed.load(Ordering::Relaxed))
    }

    /// Runs cleanup passes until no more changes occur.
    ///
    /// Returns the number of rounds that changed something.
    fn cleanup_to_fixpoint(
        ctx: &CompilerContext,
        passes: &mut [Box<dyn CfgPass>],
        max_iterations: usize,
    ) -> Result<usize> {
        let mut rounds = 0;
        for _ in 0..max_iterations {
            if !Self::run_passes_once(ctx, passes)? {
                break;
            }
            rounds += 1;
        }
        Ok(rounds)
    }

    /// Runs the complete optimization pipeline.
    ///
    /// # Arguments
    ///
    /// * `ctx` - The compiler context holding the functions to optimize.
    ///
    /// # Returns
    ///
    /// The number of cleanup rounds that changed something. Events are
    /// accumulated in `ctx.events`.
    ///
    /// # Errors
    ///
    /// Returns an error if any pass fails. The failing function's graph is
    /// put back into the context in whatever state the pass left it.
    pub fn run_pipeline(&mut self, ctx: &CompilerContext) -> Result<usize> {
        if !self.transform.is_empty() {
            let changed = Self::run_passes_once(ctx, &mut self.transform)?;
            debug!(changed, "transform phase finished");
        }

        let rounds = if self.cleanup.is_empty() {
            0
        } else {
            Self::cleanup_to_fixpoint(ctx, &mut self.cleanup, self.max_cleanup_iterations)?
        };
        debug!(rounds, "cleanup phase finished");
        Ok(rounds)
    }
}
