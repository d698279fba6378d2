//! Segment store configuration.

/// What the registry does after logging an invariant violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InvariantPolicy {
    /// Panic. The engine must not continue with inconsistent bookkeeping.
    #[default]
    Panic,
    /// Return [`crate::CoreError::InvariantViolation`] so a supervisor can
    /// restart the engine instead of crashing the process.
    Propagate,
}

/// Configuration for opening a segment store or building a registry.
#[derive(Debug, Clone)]
pub struct Config {
    /// Whether to create the storage directory if it doesn't exist.
    pub create_if_missing: bool,

    /// Use in-memory mock segment files instead of real files.
    pub mock: bool,

    /// Whether real segment files are synced to disk when closed.
    pub sync_on_close: bool,

    /// Reaction to invariant violations.
    pub invariant_policy: InvariantPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            create_if_missing: true,
            mock: false,
            sync_on_close: true,
            invariant_policy: InvariantPolicy::Panic,
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether to create the storage directory if missing.
    #[must_use]
    pub const fn create_if_missing(mut self, value: bool) -> Self {
        self.create_if_missing = value;
        self
    }

    /// Sets mock mode.
    #[must_use]
    pub const fn mock(mut self, value: bool) -> Self {
        self.mock = value;
        self
    }

    /// Sets whether segment files are synced when closed.
    #[must_use]
    pub const fn sync_on_close(mut self, value: bool) -> Self {
        self.sync_on_close = value;
        self
    }

    /// Sets the invariant violation policy.
    #[must_use]
    pub const fn invariant_policy(mut self, policy: InvariantPolicy) -> Self {
        self.invariant_policy = policy;
        self
    }
}
