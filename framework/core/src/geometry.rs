//! Length and width of individual phases, and the line arithmetic used to
//! find where a ramp meets a rate ceiling.

use anyhow::bail;

use crate::script::{Phase, PhaseShape, Script};

/// A line in the form `a·x + b·y = c`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Line {
    pub a: f64,
    pub b: f64,
    pub c: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// Two lines with no intersection point.
///
/// The splitter only ever intersects a non-horizontal ramp with a horizontal
/// ceiling, so hitting this indicates a bug in the caller rather than bad
/// input.
#[derive(derive_more::Error, derive_more::Display, Debug)]
pub struct ParallelLinesError {
    msg: String,
}

impl Default for ParallelLinesError {
    fn default() -> Self {
        Self {
            msg: "lines are parallel and do not intersect".to_string(),
        }
    }
}

/// Duration of a phase in seconds: `duration` if present, else `pause`.
pub fn phase_length(phase: &Phase) -> Option<u64> {
    phase.duration.or(phase.pause)
}

/// Peak requests-per-second of a phase.
///
/// A count phase of zero length contributes no width; the length splitter can
/// leave such stubs behind at an exact phase boundary.
pub fn phase_width(phase: &Phase) -> Option<f64> {
    let width = match phase.shape()? {
        PhaseShape::Ramp {
            arrival_rate,
            ramp_to,
            ..
        } => arrival_rate.max(ramp_to) as f64,
        PhaseShape::Constant { arrival_rate, .. } => arrival_rate as f64,
        PhaseShape::Count {
            arrival_count,
            duration,
        } => {
            if duration == 0 {
                0.0
            } else {
                arrival_count as f64 / duration as f64
            }
        }
        PhaseShape::Pause { .. } => 0.0,
    };
    Some(width)
}

/// Total duration of a script in seconds.
///
/// Fails on the first phase with no recognizable length, reporting its index.
pub fn script_length(script: &Script) -> anyhow::Result<u64> {
    let mut total = 0;
    for (index, phase) in script.config.phases.iter().enumerate() {
        match phase_length(phase) {
            Some(length) => total += length,
            None => bail!("phases[{index}] has an invalid length: {}", phase.summary()),
        }
    }
    Ok(total)
}

/// The widest instantaneous rate any phase of the script reaches.
///
/// Fails on the first phase with no recognizable shape, reporting its index.
pub fn script_width(script: &Script) -> anyhow::Result<f64> {
    let mut widest = 0.0_f64;
    for (index, phase) in script.config.phases.iter().enumerate() {
        match phase_width(phase) {
            Some(width) => widest = widest.max(width),
            None => bail!("phases[{index}] has an invalid width: {}", phase.summary()),
        }
    }
    Ok(widest)
}

/// The line passing through two points.
pub fn line_through_points(p1: Point, p2: Point) -> Line {
    let a = p2.y - p1.y;
    let b = p1.x - p2.x;
    Line {
        a,
        b,
        c: a * p1.x + b * p1.y,
    }
}

/// Intersection of two lines by Cramer's rule, rounded to the nearest integer
/// coordinates.
pub fn intersect(l1: Line, l2: Line) -> Result<Point, ParallelLinesError> {
    let det = l1.a * l2.b - l2.a * l1.b;
    if det == 0.0 {
        return Err(ParallelLinesError::default());
    }
    let x = (l2.b * l1.c - l1.b * l2.c) / det;
    let y = (l1.a * l2.c - l2.a * l1.c) / det;
    Ok(Point {
        x: x.round(),
        y: y.round(),
    })
}

/// Where a ramp phase's rate line meets the horizontal line `y = ceiling`.
pub fn intersection(phase: &Phase, ceiling: u64) -> anyhow::Result<Point> {
    let Some(PhaseShape::Ramp {
        arrival_rate,
        ramp_to,
        duration,
    }) = phase.shape()
    else {
        bail!(
            "only a ramp phase can intersect a rate ceiling: {}",
            phase.summary()
        );
    };

    let ramp = line_through_points(
        Point {
            x: 0.0,
            y: arrival_rate as f64,
        },
        Point {
            x: duration as f64,
            y: ramp_to as f64,
        },
    );
    let level = line_through_points(
        Point {
            x: 0.0,
            y: ceiling as f64,
        },
        Point {
            x: duration as f64,
            y: ceiling as f64,
        },
    );
    Ok(intersect(ramp, level)?)
}
