//! Provider identities.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identifier of a remote provider.
///
/// Breaker state, counters and fallback decisions are keyed by this id.
/// Dual-provider setups use the reserved [`ProviderId::primary`] and
/// [`ProviderId::secondary`] ids; the human-readable provider name is kept
/// separately on the provider handle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProviderId(String);

impl ProviderId {
    pub const PRIMARY: &'static str = "PRIMARY";
    pub const SECONDARY: &'static str = "SECONDARY";

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn primary() -> Self {
        Self::new(Self::PRIMARY)
    }

    pub fn secondary() -> Self {
        Self::new(Self::SECONDARY)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Only failures of the primary provider may trigger a fallback.
    pub fn is_primary(&self) -> bool {
        self.0 == Self::PRIMARY
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProviderId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}
