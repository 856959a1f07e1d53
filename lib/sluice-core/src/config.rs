//! Response configuration.

/// Configuration handed to a response at construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResponseConfig {
    /// Emit `debug` events for body buffering and stream release.
    pub debug: bool,
}

impl ResponseConfig {
    /// Configuration with debug events disabled.
    #[must_use]
    pub const fn new() -> Self {
        Self { debug: false }
    }

    /// Set whether debug events are emitted.
    #[must_use]
    pub const fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_quiet() {
        assert!(!ResponseConfig::default().debug);
        assert_eq!(ResponseConfig::new(), ResponseConfig::default());
    }

    #[test]
    fn with_debug() {
        assert!(ResponseConfig::new().with_debug(true).debug);
    }
}
