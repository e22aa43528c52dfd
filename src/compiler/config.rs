//! Configuration for the optimization pipeline.

/// Number of body copies the unroller chains per iteration of the new loop.
pub const DEFAULT_UNROLL_FACTOR: usize = 5;

/// Largest loop body, header included, the unroller will copy.
pub const DEFAULT_MAX_LOOP_BODY: usize = 15;

/// Default bound on dead-code elimination rounds per function.
pub const DEFAULT_CLEANUP_ITERATIONS: usize = 15;

/// Settings for loop unrolling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnrollConfig {
    /// Run the unrolling pass (default: true).
    pub enabled: bool,

    /// Copies of the body per unrolled iteration (default: 5).
    pub factor: usize,

    /// Loops whose body has more nodes than this are left alone (default: 15).
    pub max_body_size: usize,
}

impl Default for UnrollConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            factor: DEFAULT_UNROLL_FACTOR,
            max_body_size: DEFAULT_MAX_LOOP_BODY,
        }
    }
}

impl UnrollConfig {
    /// Creates an enabled configuration with explicit limits.
    #[must_use]
    pub fn new(factor: usize, max_body_size: usize) -> Self {
        Self {
            enabled: true,
            factor,
            max_body_size,
        }
    }
}

/// Settings for the cleanup phase (dead-code elimination).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanupConfig {
    /// Run dead-code elimination (default: true).
    pub enabled: bool,

    /// Maximum elimination rounds per function (default: 15).
    pub max_iterations: usize,

    /// Drop nodes left unreachable by a transform (default: true).
    pub sweep_unreachable: bool,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_iterations: DEFAULT_CLEANUP_ITERATIONS,
            sweep_unreachable: true,
        }
    }
}

/// Configuration for the whole optimization pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptimizerConfig {
    /// Loop unrolling settings.
    pub unroll: UnrollConfig,

    /// Dead-code elimination settings.
    pub cleanup: CleanupConfig,
}

impl OptimizerConfig {
    /// Creates a configuration from its parts.
    #[must_use]
    pub fn new(unroll: UnrollConfig, cleanup: CleanupConfig) -> Self {
        Self { unroll, cleanup }
    }

    /// A configuration with every pass turned off.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            unroll: UnrollConfig {
                enabled: false,
                ..UnrollConfig::default()
            },
            cleanup: CleanupConfig {
                enabled: false,
                sweep_unreachable: false,
                ..CleanupConfig::default()
            },
        }
    }

    /// Larger unroll limits and more cleanup rounds.
    #[must_use]
    pub fn aggressive() -> Self {
        Self {
            unroll: UnrollConfig::new(8, 32),
            cleanup: CleanupConfig {
                max_iterations: 64,
                ..CleanupConfig::default()
            },
        }
    }
}
