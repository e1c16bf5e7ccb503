//! Tunables for address encoding and for the address-based bound
//! queries used by kinds without native bounds.

/// Overrides [`Config::fallback_max_index`].
pub const COMPSLICE_FALLBACK_MAX_INDEX: &str = "COMPSLICE_FALLBACK_MAX_INDEX";

/// Overrides [`Config::compact_runs`]; accepts `0`, `1`, `true` or
/// `false`.
pub const COMPSLICE_COMPACT_RUNS: &str = "COMPSLICE_COMPACT_RUNS";

/// The largest index the host will accept in an address.
pub const DEFAULT_FALLBACK_MAX_INDEX: i64 = (1 << 31) - 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Upper end of the query range `[0:N]` used to learn bounds from
    /// the host's clamped address strings.
    pub fallback_max_index: i64,

    /// Render contiguous runs as `start:stop[:step]` when encoding.
    /// When false every index gets its own address.
    pub compact_runs: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fallback_max_index: DEFAULT_FALLBACK_MAX_INDEX,
            compact_runs: true,
        }
    }
}

impl Config {
    /// One address per element.
    pub fn verbose() -> Self {
        Self {
            compact_runs: false,
            ..Self::default()
        }
    }

    /// The default configuration with overrides taken from the
    /// process environment. Malformed values are logged and ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(value) = lookup(COMPSLICE_FALLBACK_MAX_INDEX) {
            match value.trim().parse::<i64>() {
                Ok(max) if max > 0 => config.fallback_max_index = max,
                _ => tracing::warn!(
                    "ignoring {}={}: expected a positive integer",
                    COMPSLICE_FALLBACK_MAX_INDEX,
                    value
                ),
            }
        }
        if let Some(value) = lookup(COMPSLICE_COMPACT_RUNS) {
            match value.trim() {
                "1" | "true" => config.compact_runs = true,
                "0" | "false" => config.compact_runs = false,
                _ => tracing::warn!(
                    "ignoring {}={}: expected 0 or 1",
                    COMPSLICE_COMPACT_RUNS,
                    value
                ),
            }
        }
        config
    }
}
