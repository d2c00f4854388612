//! Structural and numeric bounds on an incoming script.

use anyhow::bail;

use crate::geometry::{phase_width, script_length};
use crate::script::Script;
use crate::settings::SplitSettings;

/// Check a script against the resolved split limits before orchestration.
///
/// `_split` itself is checked earlier, by
/// [`SplitSettings::resolve`]; by the time this runs the limits are known to
/// be well-formed.
pub fn validate(script: &Script, settings: &SplitSettings) -> anyhow::Result<()> {
    if script.config.phases.is_empty() {
        bail!("a script must define at least one phase under config.phases");
    }

    // Reports the first phase with no usable length, by index.
    let total = script_length(script)?;

    if total > settings.max_script_duration_s {
        bail!(
            "the script takes {total}s to run, longer than the permitted maximum of {}s",
            settings.max_script_duration_s
        );
    }

    for (index, phase) in script.config.phases.iter().enumerate() {
        let Some(width) = phase_width(phase) else {
            bail!("phases[{index}] has an invalid width: {}", phase.summary());
        };
        if width > settings.max_script_rps as f64 {
            bail!(
                "phases[{index}] generates up to {width} requests per second, more than the \
                 permitted maximum of {}: {}",
                settings.max_script_rps,
                phase.summary()
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::Phase;

    fn check(script: &Script) -> anyhow::Result<()> {
        validate(script, &SplitSettings::default())
    }

    #[test]
    fn accepts_a_compliant_script() {
        let script = Script::from_phases(vec![
            Phase::constant(10, 120),
            Phase::ramp(0, 50, 100),
            Phase::count(100, 10),
            Phase::pause(30),
        ]);
        check(&script).unwrap();
    }

    #[test]
    fn rejects_a_script_with_no_phases() {
        let err = check(&Script::from_phases(vec![])).unwrap_err().to_string();
        assert!(err.contains("at least one phase"), "{err}");
    }

    #[test]
    fn rejects_a_phase_with_no_length() {
        let mut bad = Phase::default();
        bad.arrival_rate = Some(10);
        let script = Script::from_phases(vec![Phase::pause(1), bad]);
        let err = check(&script).unwrap_err().to_string();
        assert!(err.contains("phases[1]"), "{err}");
        assert!(err.contains("invalid length"), "{err}");
    }

    #[test]
    fn rejects_a_script_that_runs_too_long() {
        let script = Script::from_phases(vec![Phase::constant(1, 86_401)]);
        let err = check(&script).unwrap_err().to_string();
        assert!(err.contains("86400"), "{err}");
    }

    #[test]
    fn rejects_a_phase_with_no_width() {
        // A length but no recognizable shape: pause plus a stray rampTo is
        // still a pause, but duration with only rampTo is shapeless.
        let mut bad = Phase::default();
        bad.duration = Some(10);
        bad.pause = Some(10);
        bad.ramp_to = Some(5);
        let script = Script::from_phases(vec![bad]);
        let err = check(&script).unwrap_err().to_string();
        assert!(err.contains("phases[0]"), "{err}");
        assert!(err.contains("invalid width"), "{err}");
    }

    #[test]
    fn rejects_a_phase_wider_than_the_script_limit() {
        let script = Script::from_phases(vec![Phase::pause(1), Phase::constant(5_001, 10)]);
        let err = check(&script).unwrap_err().to_string();
        assert!(err.contains("phases[1]"), "{err}");
        assert!(err.contains("5000"), "{err}");
    }

    #[test]
    fn respects_lowered_limits() {
        let mut script = Script::from_phases(vec![Phase::constant(10, 120)]);
        script.split = Some(serde_json::json!({ "maxScriptRequestsPerSecond": 5 }));
        let settings = SplitSettings::resolve(&script).unwrap();
        let err = validate(&script, &settings).unwrap_err().to_string();
        assert!(err.contains("phases[0]"), "{err}");
    }
}
