//! Evaluator configuration.

/// Limits for one evaluation pass, threaded explicitly through scope
/// creation (no ambient globals).
#[derive(Clone, Copy, Debug)]
pub struct EvalConfig {
    /// Maximum depth of nested binding resolutions within one pass. A pass
    /// that exceeds it errors the offending binding instead of overflowing
    /// the stack.
    pub max_depth: usize,
}

impl Default for EvalConfig {
    fn default() -> Self {
        EvalConfig { max_depth: 128 }
    }
}
