//! Cascade configuration.

/// Default nested cascade depth limit used by [`CascadeConfig::bounded`].
pub const DEFAULT_MAX_DEPTH: usize = 100;

/// Cascade executor configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CascadeConfig {
    /// Hard-delete cascade targets whose type is not soft-deleteable.
    /// When off, such targets fail with `MissingCascadeField`.
    pub hard_delete_fallback: bool,

    /// Maximum nested soft-delete depth. None relies on the idempotence
    /// guard alone.
    pub max_depth: Option<usize>,
}

impl CascadeConfig {
    /// Create the default configuration.
    pub fn new() -> Self {
        Self {
            hard_delete_fallback: true,
            max_depth: None,
        }
    }

    /// Default configuration with [`DEFAULT_MAX_DEPTH`] applied.
    pub fn bounded() -> Self {
        Self::new().with_max_depth(DEFAULT_MAX_DEPTH)
    }

    /// Set whether non-soft-deleteable cascade targets are hard-deleted.
    pub fn with_hard_delete_fallback(mut self, enabled: bool) -> Self {
        self.hard_delete_fallback = enabled;
        self
    }

    /// Set the maximum nested depth.
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Remove the depth limit.
    pub fn without_max_depth(mut self) -> Self {
        self.max_depth = None;
        self
    }

    /// Check whether `depth` is past the configured limit.
    pub fn exceeds_depth(&self, depth: usize) -> bool {
        self.max_depth.is_some_and(|max| depth > max)
    }
}

impl Default for CascadeConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CascadeConfig::default();
        assert!(config.hard_delete_fallback);
        assert!(config.max_depth.is_none());
        assert!(!config.exceeds_depth(usize::MAX));
    }

    #[test]
    fn test_config_builder() {
        let config = CascadeConfig::new()
            .with_hard_delete_fallback(false)
            .with_max_depth(2);

        assert!(!config.hard_delete_fallback);
        assert!(!config.exceeds_depth(2));
        assert!(config.exceeds_depth(3));

        assert!(config.without_max_depth().max_depth.is_none());
        assert_eq!(CascadeConfig::bounded().max_depth, Some(DEFAULT_MAX_DEPTH));
    }
}
