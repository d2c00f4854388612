//! Splitting a single phase, either at a point in time or at a rate ceiling.

use anyhow::Context;

use crate::geometry::{intersection, phase_length};
use crate::script::{Phase, PhaseShape};

/// A phase cut at a point in time: the first `k` seconds and the rest.
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseHalves {
    pub chunk: Phase,
    pub remainder: Phase,
}

/// A phase cut at a rate ceiling: the traffic at or below the ceiling and the
/// overflow above it.
///
/// Each side is a list because a ramp that crosses the ceiling decomposes
/// into two sub-phases per side.
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseBands {
    pub chunk: Vec<Phase>,
    pub remainder: Vec<Phase>,
}

/// A ramp whose ceiling crossing rounds onto one of its endpoints.
///
/// The splitter cannot produce a zero-length sub-phase pair from such a
/// crossing; by the time a ramp is split its peak strictly exceeds the
/// ceiling, so this indicates an arithmetic problem rather than bad input.
#[derive(derive_more::Error, derive_more::Display, Debug)]
pub struct DegenerateCrossingError {
    msg: String,
}

impl DegenerateCrossingError {
    fn new(phase: &Phase, ceiling: u64, x: u64) -> Self {
        Self {
            msg: format!(
                "ramp crosses the ceiling {ceiling} at second {x}, on a phase edge: {}",
                phase.summary()
            ),
        }
    }
}

/// Cut the first `k` seconds off a phase.
///
/// The chunk keeps the phase's shape over `[0, k)` and the remainder covers
/// `[k, length)`. Splitting a ramp rounds the rate at the seam to the nearest
/// integer, which introduces a small slope discontinuity between the two
/// halves.
pub fn split_phase_by_length(phase: &Phase, k: u64) -> anyhow::Result<PhaseHalves> {
    let shape = phase
        .shape()
        .with_context(|| format!("cannot split a shapeless phase: {}", phase.summary()))?;
    let length = phase_length(phase).unwrap_or(0);
    anyhow::ensure!(
        k <= length,
        "cannot take {k}s from a phase that only lasts {length}s"
    );

    Ok(match shape {
        PhaseShape::Constant {
            arrival_rate,
            duration,
        } => PhaseHalves {
            chunk: phase.to_constant(arrival_rate, k),
            remainder: phase.to_constant(arrival_rate, duration - k),
        },
        PhaseShape::Ramp {
            arrival_rate,
            ramp_to,
            duration,
        } => {
            let ratio = k as f64 / duration as f64;
            let diff = ramp_to as f64 - arrival_rate as f64;
            let seam = (arrival_rate as f64 + diff * ratio).round() as u64;
            PhaseHalves {
                chunk: phase.to_ramp(arrival_rate, seam, k),
                remainder: phase.to_ramp(seam, ramp_to, duration - k),
            }
        }
        PhaseShape::Count {
            arrival_count,
            duration,
        } => {
            let ratio = k as f64 / duration as f64;
            let chunk_count = (arrival_count as f64 * ratio).round() as u64;
            PhaseHalves {
                chunk: phase.to_count(chunk_count, k),
                remainder: phase.to_count(arrival_count - chunk_count, duration - k),
            }
        }
        PhaseShape::Pause { pause } => PhaseHalves {
            chunk: phase.to_pause(k),
            remainder: phase.to_pause(pause - k),
        },
    })
}

/// Slice a phase horizontally at a rate ceiling.
///
/// The chunk carries everything at or below the ceiling and never exceeds it;
/// the remainder carries the overflow, padded with pauses so that both sides
/// span the phase's full duration and stay aligned in time.
pub fn split_phase_by_width(phase: &Phase, ceiling: u64) -> anyhow::Result<PhaseBands> {
    let shape = phase
        .shape()
        .with_context(|| format!("cannot split a shapeless phase: {}", phase.summary()))?;

    // A ramp that goes nowhere is a constant-rate phase.
    let shape = match shape {
        PhaseShape::Ramp {
            arrival_rate,
            ramp_to,
            duration,
        } if arrival_rate == ramp_to => PhaseShape::Constant {
            arrival_rate,
            duration,
        },
        other => other,
    };

    Ok(match shape {
        PhaseShape::Ramp {
            arrival_rate,
            ramp_to,
            duration,
        } => {
            let hi = arrival_rate.max(ramp_to);
            let lo = arrival_rate.min(ramp_to);
            if hi <= ceiling {
                // The whole ramp fits under the ceiling.
                PhaseBands {
                    chunk: vec![phase.to_ramp(arrival_rate, ramp_to, duration)],
                    remainder: vec![phase.to_pause(duration)],
                }
            } else if lo >= ceiling {
                // The whole ramp rides above the ceiling.
                PhaseBands {
                    chunk: vec![phase.to_constant(ceiling, duration)],
                    remainder: vec![
                        phase.to_ramp(arrival_rate - ceiling, ramp_to - ceiling, duration),
                    ],
                }
            } else {
                let x = intersection(phase, ceiling)?.x as u64;
                if x == 0 || x == duration {
                    return Err(DegenerateCrossingError::new(phase, ceiling, x).into());
                }
                if arrival_rate < ramp_to {
                    // Ramping up: the ceiling is hit at x and held from there.
                    // The remainder's ramp starts at 1 rather than 0 because
                    // the runner rejects zero-rate ramps.
                    PhaseBands {
                        chunk: vec![
                            phase.to_ramp(arrival_rate, ceiling, x),
                            phase.to_constant(ceiling, duration - x),
                        ],
                        remainder: vec![
                            phase.to_pause(x),
                            phase.to_ramp(1, ramp_to - ceiling, duration - x),
                        ],
                    }
                } else {
                    // Ramping down: the ceiling is held until x.
                    PhaseBands {
                        chunk: vec![
                            phase.to_constant(ceiling, x),
                            phase.to_ramp(ceiling, ramp_to, duration - x),
                        ],
                        remainder: vec![
                            phase.to_ramp(arrival_rate - ceiling, 1, x),
                            phase.to_pause(duration - x),
                        ],
                    }
                }
            }
        }
        PhaseShape::Constant {
            arrival_rate,
            duration,
        } => {
            if arrival_rate > ceiling {
                PhaseBands {
                    chunk: vec![phase.to_constant(ceiling, duration)],
                    remainder: vec![phase.to_constant(arrival_rate - ceiling, duration)],
                }
            } else {
                PhaseBands {
                    chunk: vec![phase.to_constant(arrival_rate, duration)],
                    remainder: vec![phase.to_pause(duration)],
                }
            }
        }
        PhaseShape::Count {
            arrival_count,
            duration,
        } => {
            let rps = if duration == 0 {
                0.0
            } else {
                arrival_count as f64 / duration as f64
            };
            if rps >= ceiling as f64 {
                let chunk_count = (ceiling as f64 * duration as f64).floor() as u64;
                PhaseBands {
                    chunk: vec![phase.to_count(chunk_count, duration)],
                    remainder: vec![phase.to_count(arrival_count - chunk_count, duration)],
                }
            } else {
                PhaseBands {
                    chunk: vec![phase.to_count(arrival_count, duration)],
                    remainder: vec![phase.to_pause(duration)],
                }
            }
        }
        // A pause has no width to give; both sides keep it so downstream
        // timing stays aligned.
        PhaseShape::Pause { pause } => PhaseBands {
            chunk: vec![phase.to_pause(pause)],
            remainder: vec![phase.to_pause(pause)],
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn length_split_constant() {
        let halves = split_phase_by_length(&Phase::constant(10, 600), 240).unwrap();
        assert_eq!(halves.chunk, Phase::constant(10, 240));
        assert_eq!(halves.remainder, Phase::constant(10, 360));
    }

    #[test]
    fn length_split_ramp_rounds_the_seam() {
        let halves = split_phase_by_length(&Phase::ramp(0, 50, 100), 30).unwrap();
        assert_eq!(halves.chunk, Phase::ramp(0, 15, 30));
        assert_eq!(halves.remainder, Phase::ramp(15, 50, 70));

        // 10 + 25·(1/3) rounds to 18.
        let halves = split_phase_by_length(&Phase::ramp(10, 35, 90), 30).unwrap();
        assert_eq!(halves.chunk, Phase::ramp(10, 18, 30));
        assert_eq!(halves.remainder, Phase::ramp(18, 35, 60));
    }

    #[test]
    fn length_split_count_preserves_the_total() {
        let halves = split_phase_by_length(&Phase::count(100, 10), 3).unwrap();
        assert_eq!(halves.chunk, Phase::count(30, 3));
        assert_eq!(halves.remainder, Phase::count(70, 7));
    }

    #[test]
    fn length_split_pause() {
        let halves = split_phase_by_length(&Phase::pause(30), 10).unwrap();
        assert_eq!(halves.chunk, Phase::pause(10));
        assert_eq!(halves.remainder, Phase::pause(20));
    }

    #[test]
    fn length_split_at_the_full_length_leaves_an_empty_remainder() {
        let halves = split_phase_by_length(&Phase::constant(10, 30), 30).unwrap();
        assert_eq!(halves.chunk, Phase::constant(10, 30));
        assert_eq!(halves.remainder, Phase::constant(10, 0));
    }

    #[test]
    fn length_split_beyond_the_phase_fails() {
        assert!(split_phase_by_length(&Phase::constant(10, 30), 31).is_err());
    }

    #[test]
    fn width_split_ramp_under_the_ceiling() {
        let bands = split_phase_by_width(&Phase::ramp(1, 20, 60), 25).unwrap();
        assert_eq!(bands.chunk, vec![Phase::ramp(1, 20, 60)]);
        assert_eq!(bands.remainder, vec![Phase::pause(60)]);
    }

    #[test]
    fn width_split_ramp_entirely_above_the_ceiling() {
        let bands = split_phase_by_width(&Phase::ramp(30, 60, 50), 25).unwrap();
        assert_eq!(bands.chunk, vec![Phase::constant(25, 50)]);
        assert_eq!(bands.remainder, vec![Phase::ramp(5, 35, 50)]);
    }

    #[test]
    fn width_split_ramp_crossing_upwards() {
        // Scenario S4: intersection at x = 50.
        let bands = split_phase_by_width(&Phase::ramp(0, 50, 100), 25).unwrap();
        assert_eq!(
            bands.chunk,
            vec![Phase::ramp(0, 25, 50), Phase::constant(25, 50)]
        );
        assert_eq!(bands.remainder, vec![Phase::pause(50), Phase::ramp(1, 25, 50)]);
    }

    #[test]
    fn width_split_ramp_crossing_downwards() {
        let bands = split_phase_by_width(&Phase::ramp(50, 0, 100), 25).unwrap();
        assert_eq!(
            bands.chunk,
            vec![Phase::constant(25, 50), Phase::ramp(25, 0, 50)]
        );
        assert_eq!(bands.remainder, vec![Phase::ramp(25, 1, 50), Phase::pause(50)]);
    }

    #[test]
    fn width_split_degenerate_ramp_is_treated_as_constant() {
        let phase: Phase = serde_json::from_str(
            r#"{ "duration": 60, "arrivalRate": 40, "rampTo": 40 }"#,
        )
        .unwrap();
        let bands = split_phase_by_width(&phase, 25).unwrap();
        assert_eq!(bands.chunk, vec![Phase::constant(25, 60)]);
        assert_eq!(bands.remainder, vec![Phase::constant(15, 60)]);
    }

    #[test]
    fn width_split_constant() {
        let bands = split_phase_by_width(&Phase::constant(100, 60), 25).unwrap();
        assert_eq!(bands.chunk, vec![Phase::constant(25, 60)]);
        assert_eq!(bands.remainder, vec![Phase::constant(75, 60)]);

        let bands = split_phase_by_width(&Phase::constant(10, 60), 25).unwrap();
        assert_eq!(bands.chunk, vec![Phase::constant(10, 60)]);
        assert_eq!(bands.remainder, vec![Phase::pause(60)]);
    }

    #[test]
    fn width_split_count() {
        // Scenario S5.
        let bands = split_phase_by_width(&Phase::count(100, 10), 5).unwrap();
        assert_eq!(bands.chunk, vec![Phase::count(50, 10)]);
        assert_eq!(bands.remainder, vec![Phase::count(50, 10)]);

        let bands = split_phase_by_width(&Phase::count(30, 10), 5).unwrap();
        assert_eq!(bands.chunk, vec![Phase::count(30, 10)]);
        assert_eq!(bands.remainder, vec![Phase::pause(10)]);
    }

    #[test]
    fn width_split_pause_is_kept_on_both_sides() {
        let bands = split_phase_by_width(&Phase::pause(30), 25).unwrap();
        assert_eq!(bands.chunk, vec![Phase::pause(30)]);
        assert_eq!(bands.remainder, vec![Phase::pause(30)]);
    }

    #[test]
    fn width_split_preserves_auxiliary_attributes() {
        let phase: Phase = serde_json::from_str(
            r#"{ "duration": 100, "arrivalRate": 0, "rampTo": 50, "name": "spike" }"#,
        )
        .unwrap();
        let bands = split_phase_by_width(&phase, 25).unwrap();
        for sub in bands.chunk.iter().chain(bands.remainder.iter()) {
            assert_eq!(sub.extra.get("name").unwrap(), "spike");
        }
    }
}
