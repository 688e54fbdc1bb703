/// Configuration for executing operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionConfig {
    /// Compute independent aggregates on the rayon thread pool.
    ///
    /// Output is the same either way.
    pub enable_parallel: bool,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        ExecutionConfig {
            enable_parallel: true,
        }
    }
}
