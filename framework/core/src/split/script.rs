//! Splitting a whole script across its phase sequence.

use std::collections::VecDeque;

use anyhow::Context;

use crate::geometry::phase_length;
use crate::script::Script;
use crate::split::phase::{split_phase_by_length, split_phase_by_width};

/// A script cut into a worker-sized chunk and the rest.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptHalves {
    pub chunk: Script,
    pub remainder: Script,
}

/// Cut the first `k` seconds off a script.
///
/// Phases move whole into the chunk while they are strictly shorter than the
/// remaining budget; the phase on the boundary is split in two. A phase whose
/// length equals the remaining budget is therefore split at its full length,
/// leaving a zero-length stub at the head of the remainder.
///
/// The remainder keeps the input's backing storage and loses its `_start`,
/// which the orchestrator recomputes from the chunk's schedule.
pub fn split_script_by_length(script: Script, k: u64) -> anyhow::Result<ScriptHalves> {
    let mut chunk = script.clone();
    chunk.config.phases.clear();

    let mut remainder = script;
    remainder.start = None;

    let mut budget = k;
    let mut phases: VecDeque<_> = remainder.config.phases.drain(..).collect();
    while let Some(phase) = phases.pop_front() {
        let length = phase_length(&phase)
            .with_context(|| format!("cannot split a phase with no length: {}", phase.summary()))?;
        if length < budget {
            budget -= length;
            chunk.config.phases.push(phase);
        } else {
            let halves = split_phase_by_length(&phase, budget)?;
            chunk.config.phases.push(halves.chunk);
            phases.push_front(halves.remainder);
            break;
        }
    }
    remainder.config.phases = phases.into();

    Ok(ScriptHalves { chunk, remainder })
}

/// Slice a script horizontally at a rate ceiling.
///
/// Both sides are deep copies spanning the input's full duration; the chunk
/// never exceeds the ceiling and the remainder carries the overflow.
pub fn split_script_by_width(script: &Script, ceiling: u64) -> anyhow::Result<ScriptHalves> {
    let mut chunk = script.clone();
    chunk.config.phases.clear();
    let mut remainder = chunk.clone();

    for phase in &script.config.phases {
        let bands = split_phase_by_width(phase, ceiling)?;
        chunk.config.phases.extend(bands.chunk);
        remainder.config.phases.extend(bands.remainder);
    }

    Ok(ScriptHalves { chunk, remainder })
}
