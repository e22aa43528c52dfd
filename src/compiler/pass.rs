//! The trait implemented by every optimization pass.

use crate::{analysis::Graph, compiler::context::CompilerContext, Result};

/// An optimization pass that rewrites one function's control-flow graph.
///
/// All passes must be thread-safe (Send + Sync) so the scheduler can run a
/// pass over many functions in parallel. Passes receive exclusive access to
/// the graph they transform and shared access to the compiler context.
pub trait CfgPass: Send + Sync {
    /// Unique name for logging and debugging.
    fn name(&self) -> &'static str;

    /// Should this pass run on a specific function?
    ///
    /// Called before `run_on_function`. Override to skip functions that
    /// don't need this pass.
    fn should_run(&self, _function: &str, _ctx: &CompilerContext) -> bool {
        true
    }

    /// Run the pass on a single function.
    ///
    /// Returns `true` if any changes were made, `false` otherwise.
    /// Events should be recorded directly to `ctx.events`.
    ///
    /// # Arguments
    ///
    /// * `graph` - The function body to transform.
    /// * `function` - The function's name.
    /// * `ctx` - The compiler context (thread-safe, uses shared reference).
    ///
    /// # Errors
    ///
    /// Returns an error if the pass fails to process the function. The graph
    /// may have been partially rewritten in that case.
    fn run_on_function(
        &self,
        graph: &mut Graph,
        function: &str,
        ctx: &CompilerContext,
    ) -> Result<bool>;

    /// Called once before the pass runs in a phase.
    ///
    /// # Errors
    ///
    /// Returns an error if initialization fails.
    fn initialize(&mut self, _ctx: &CompilerContext) -> Result<()> {
        Ok(())
    }

    /// Called once after the pass completes in a phase.
    ///
    /// # Errors
    ///
    /// Returns an error if finalization fails.
    fn finalize(&mut self, _ctx: &CompilerContext) -> Result<()> {
        Ok(())
    }

    /// Get a description of what this pass does.
    fn description(&self) -> &'static str {
        "No description available"
    }
}
