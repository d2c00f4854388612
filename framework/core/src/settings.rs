use anyhow::bail;
use serde_json::{Map, Value};

use crate::script::Script;

/// Reject scripts that run longer than a day.
pub const DEFAULT_MAX_SCRIPT_DURATION_S: u64 = 86_400;
/// Reject any phase that asks for more traffic than this.
pub const DEFAULT_MAX_SCRIPT_RPS: u64 = 5_000;
/// Length-split a script once its total duration exceeds this.
pub const DEFAULT_MAX_CHUNK_DURATION_S: u64 = 240;
/// Width-split a script once any phase's rate exceeds this.
pub const DEFAULT_MAX_CHUNK_RPS: u64 = 25;
/// Schedule dispatches this far ahead of a chunk's start to absorb peer
/// cold-start latency.
pub const DEFAULT_TIME_BUFFER_MS: u64 = 15_000;

/// The effective split limits for one orchestrator invocation.
///
/// Each limit defaults to its compiled constant; a script may lower any of
/// them through its `_split` object but can never raise one above the
/// default, which doubles as the hard ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitSettings {
    pub max_script_duration_s: u64,
    pub max_script_rps: u64,
    pub max_chunk_duration_s: u64,
    pub max_chunk_rps: u64,
    pub time_buffer_ms: u64,
}

impl Default for SplitSettings {
    fn default() -> Self {
        Self {
            max_script_duration_s: DEFAULT_MAX_SCRIPT_DURATION_S,
            max_script_rps: DEFAULT_MAX_SCRIPT_RPS,
            max_chunk_duration_s: DEFAULT_MAX_CHUNK_DURATION_S,
            max_chunk_rps: DEFAULT_MAX_CHUNK_RPS,
            time_buffer_ms: DEFAULT_TIME_BUFFER_MS,
        }
    }
}

impl SplitSettings {
    /// Resolve the effective settings for a script from its `_split` object.
    pub fn resolve(script: &Script) -> anyhow::Result<Self> {
        let Some(split) = &script.split else {
            return Ok(Self::default());
        };
        let Some(overrides) = split.as_object() else {
            bail!("_split must be an object, got: {split}");
        };

        Ok(Self {
            max_script_duration_s: resolve_limit(
                overrides,
                "maxScriptDurationInSeconds",
                DEFAULT_MAX_SCRIPT_DURATION_S,
            )?,
            max_script_rps: resolve_limit(
                overrides,
                "maxScriptRequestsPerSecond",
                DEFAULT_MAX_SCRIPT_RPS,
            )?,
            max_chunk_duration_s: resolve_limit(
                overrides,
                "maxChunkDurationInSeconds",
                DEFAULT_MAX_CHUNK_DURATION_S,
            )?,
            max_chunk_rps: resolve_limit(
                overrides,
                "maxChunkRequestsPerSecond",
                DEFAULT_MAX_CHUNK_RPS,
            )?,
            time_buffer_ms: resolve_limit(
                overrides,
                "timeBufferInMilliseconds",
                DEFAULT_TIME_BUFFER_MS,
            )?,
        })
    }
}

fn resolve_limit(overrides: &Map<String, Value>, name: &str, ceiling: u64) -> anyhow::Result<u64> {
    let Some(value) = overrides.get(name) else {
        return Ok(ceiling);
    };
    match value.as_u64() {
        Some(v) if (1..=ceiling).contains(&v) => Ok(v),
        _ => bail!(
            "_split.{name} must be a positive integer no greater than {ceiling}, got: {value}"
        ),
    }
}
