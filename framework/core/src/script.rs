use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A load-test script, either as submitted by the caller or as one of the
/// worker-sized chunks the splitter carves out of it.
///
/// The underscore-prefixed control fields ride along on the wire unchanged so
/// that a peer worker receiving a chunk can treat it as a fresh top-level
/// invocation. Unrecognized top-level fields are kept in `extra` and survive
/// every split.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Script {
    #[serde(default)]
    pub config: ScriptConfig,

    /// Raw `_split` override object, resolved by
    /// [`SplitSettings::resolve`](crate::prelude::SplitSettings::resolve).
    #[serde(rename = "_split", default, skip_serializing_if = "Option::is_none")]
    pub split: Option<Value>,

    /// Epoch-millisecond timestamp of the original top-level invocation.
    /// Assigned once by the first worker and never changed by descendants.
    #[serde(rename = "_genesis", default, skip_serializing_if = "Option::is_none")]
    pub genesis: Option<u64>,

    /// Epoch-millisecond wall-clock time at which this chunk must begin
    /// emitting load. Assigned by the parent; a child never decreases it.
    #[serde(rename = "_start", default, skip_serializing_if = "Option::is_none")]
    pub start: Option<u64>,

    /// When set, the orchestrator emits progress diagnostics for this script
    /// and all of its descendants.
    #[serde(rename = "_trace", default, skip_serializing_if = "std::ops::Not::not")]
    pub trace: bool,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScriptConfig {
    #[serde(default)]
    pub phases: Vec<Phase>,

    /// Engine-facing configuration (`target`, `scenarios`, ...) that the
    /// splitter carries through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Script {
    /// A script with the given phases and no control fields, mostly useful
    /// for building scripts programmatically.
    pub fn from_phases(phases: Vec<Phase>) -> Self {
        Self {
            config: ScriptConfig {
                phases,
                extra: Map::new(),
            },
            split: None,
            genesis: None,
            start: None,
            trace: false,
            extra: Map::new(),
        }
    }
}

/// One interval of the load curve.
///
/// The shape of a phase is encoded by which fields are present, matching the
/// wire format. Use [`Phase::shape`] to classify a phase into one of the four
/// recognized shapes; a phase matching none of them is rejected by the
/// validator. Fields that are not part of the shape (names, per-phase
/// scenario overrides) are kept in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Phase {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pause: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arrival_rate: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ramp_to: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arrival_count: Option<u64>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The four recognized phase shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseShape {
    /// `arrivalRate` users per second for `duration` seconds.
    Constant { arrival_rate: u64, duration: u64 },
    /// Linear ramp from `arrivalRate` to `rampTo` over `duration` seconds.
    Ramp {
        arrival_rate: u64,
        ramp_to: u64,
        duration: u64,
    },
    /// `arrivalCount` users spread over `duration` seconds.
    Count {
        arrival_count: u64,
        duration: u64,
    },
    /// No traffic for `pause` seconds.
    Pause { pause: u64 },
}

impl Phase {
    /// Classify this phase by field presence.
    ///
    /// Returns `None` when the fields match none of the four shapes, which is
    /// the validator's "invalid phase" case.
    pub fn shape(&self) -> Option<PhaseShape> {
        if let Some(duration) = self.duration {
            if let Some(arrival_rate) = self.arrival_rate {
                return Some(match self.ramp_to {
                    Some(ramp_to) => PhaseShape::Ramp {
                        arrival_rate,
                        ramp_to,
                        duration,
                    },
                    None => PhaseShape::Constant {
                        arrival_rate,
                        duration,
                    },
                });
            }
            return self.arrival_count.map(|arrival_count| PhaseShape::Count {
                arrival_count,
                duration,
            });
        }
        self.pause.map(|pause| PhaseShape::Pause { pause })
    }

    /// A constant-rate copy of this phase. Auxiliary attributes are kept,
    /// shape fields that do not apply are dropped.
    pub fn to_constant(&self, arrival_rate: u64, duration: u64) -> Phase {
        Phase {
            duration: Some(duration),
            pause: None,
            arrival_rate: Some(arrival_rate),
            ramp_to: None,
            arrival_count: None,
            extra: self.extra.clone(),
        }
    }

    /// A ramp copy of this phase.
    pub fn to_ramp(&self, arrival_rate: u64, ramp_to: u64, duration: u64) -> Phase {
        Phase {
            duration: Some(duration),
            pause: None,
            arrival_rate: Some(arrival_rate),
            ramp_to: Some(ramp_to),
            arrival_count: None,
            extra: self.extra.clone(),
        }
    }

    /// A count-over-duration copy of this phase.
    pub fn to_count(&self, arrival_count: u64, duration: u64) -> Phase {
        Phase {
            duration: Some(duration),
            pause: None,
            arrival_rate: None,
            ramp_to: None,
            arrival_count: Some(arrival_count),
            extra: self.extra.clone(),
        }
    }

    /// A pause copy of this phase.
    pub fn to_pause(&self, pause: u64) -> Phase {
        Phase {
            duration: None,
            pause: Some(pause),
            arrival_rate: None,
            ramp_to: None,
            arrival_count: None,
            extra: self.extra.clone(),
        }
    }

    /// JSON rendering of the phase for error messages.
    pub fn summary(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| format!("{self:?}"))
    }

    /// Shorthand constructors for building phases programmatically.
    pub fn constant(arrival_rate: u64, duration: u64) -> Phase {
        Phase::default().to_constant(arrival_rate, duration)
    }

    pub fn ramp(arrival_rate: u64, ramp_to: u64, duration: u64) -> Phase {
        Phase::default().to_ramp(arrival_rate, ramp_to, duration)
    }

    pub fn count(arrival_count: u64, duration: u64) -> Phase {
        Phase::default().to_count(arrival_count, duration)
    }

    pub fn pause(pause: u64) -> Phase {
        Phase::default().to_pause(pause)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_all_four_shapes() {
        let script: Script = serde_json::from_str(
            r#"{
                "config": {
                    "phases": [
                        { "duration": 120, "arrivalRate": 10 },
                        { "duration": 100, "arrivalRate": 0, "rampTo": 50 },
                        { "duration": 10, "arrivalCount": 100 },
                        { "pause": 30 }
                    ]
                }
            }"#,
        )
        .unwrap();

        let shapes: Vec<_> = script
            .config
            .phases
            .iter()
            .map(|p| p.shape().unwrap())
            .collect();
        assert_eq!(
            shapes,
            vec![
                PhaseShape::Constant {
                    arrival_rate: 10,
                    duration: 120
                },
                PhaseShape::Ramp {
                    arrival_rate: 0,
                    ramp_to: 50,
                    duration: 100
                },
                PhaseShape::Count {
                    arrival_count: 100,
                    duration: 10
                },
                PhaseShape::Pause { pause: 30 },
            ]
        );
    }

    #[test]
    fn unrecognizable_phase_has_no_shape() {
        let phase: Phase = serde_json::from_str(r#"{ "arrivalRate": 10 }"#).unwrap();
        assert!(phase.shape().is_none());

        let phase: Phase = serde_json::from_str(r#"{ "duration": 10 }"#).unwrap();
        assert!(phase.shape().is_none());
    }

    #[test]
    fn auxiliary_attributes_survive_shape_rewrites() {
        let phase: Phase = serde_json::from_str(
            r#"{ "duration": 60, "arrivalRate": 10, "name": "warm up", "weight": 3 }"#,
        )
        .unwrap();

        let rewritten = phase.to_pause(60);
        assert_eq!(rewritten.extra.get("name").unwrap(), "warm up");
        assert_eq!(rewritten.extra.get("weight").unwrap(), 3);
        assert_eq!(rewritten.shape(), Some(PhaseShape::Pause { pause: 60 }));
        assert!(rewritten.arrival_rate.is_none());
    }

    #[test]
    fn control_fields_round_trip_with_wire_names() {
        let json = r#"{
            "config": { "target": "http://localhost:8080", "phases": [ { "pause": 1 } ] },
            "_genesis": 1000,
            "_start": 2000,
            "_trace": true
        }"#;
        let script: Script = serde_json::from_str(json).unwrap();
        assert_eq!(script.genesis, Some(1000));
        assert_eq!(script.start, Some(2000));
        assert!(script.trace);
        assert_eq!(
            script.config.extra.get("target").unwrap(),
            "http://localhost:8080"
        );

        let value = serde_json::to_value(&script).unwrap();
        assert_eq!(value["_genesis"], 1000);
        assert_eq!(value["_start"], 2000);
        assert_eq!(value["_trace"], true);
        assert_eq!(value["config"]["target"], "http://localhost:8080");
    }

    #[test]
    fn clones_are_deep() {
        let mut script: Script = serde_json::from_str(
            r#"{ "config": { "phases": [ { "pause": 1, "name": "idle" } ] } }"#,
        )
        .unwrap();
        let copy = script.clone();

        script.config.phases[0].pause = Some(99);
        script.config.phases[0]
            .extra
            .insert("name".to_string(), "busy".into());

        assert_eq!(copy.config.phases[0].pause, Some(1));
        assert_eq!(copy.config.phases[0].extra.get("name").unwrap(), "idle");
    }
}
