//! Clock-drift probing against an external time source.
//!
//! Purely informational: chunk schedules are computed from the local clock
//! regardless, the probe only warns the operator when peers are likely to
//! disagree about when `_start` is.

use anyhow::Context;
use async_trait::async_trait;

use crate::orchestrator::now_millis;

/// Local clocks further than this from the reference get a warning.
pub const CLOCK_DRIFT_THRESHOLD_MS: u64 = 250;

/// An external source of wall-clock time.
#[async_trait]
pub trait ReferenceClock: Send + Sync {
    async fn now_millis(&self) -> anyhow::Result<u64>;
}

/// Probe the reference clock once and warn when the local clock is off.
///
/// Never affects control flow; a probe failure is itself only a warning.
pub async fn check_clock_drift<C: ReferenceClock + ?Sized>(reference: &C) {
    let local = now_millis();
    match reference.now_millis().await {
        Ok(reference_now) => match excessive_drift(local, reference_now) {
            Some(drift) => log::warn!(
                "Local clock differs from the reference time source by {drift}ms; peers may \
                 disagree about scheduled start times"
            ),
            None => log::debug!(
                "Clock drift against the reference time source is within {CLOCK_DRIFT_THRESHOLD_MS}ms"
            ),
        },
        Err(e) => log::warn!("Could not probe the reference time source: {e:#}"),
    }
}

fn excessive_drift(local: u64, reference: u64) -> Option<u64> {
    let drift = local.abs_diff(reference);
    (drift > CLOCK_DRIFT_THRESHOLD_MS).then_some(drift)
}

/// Reference clock read from the `Date` header of an HTTP response.
pub struct HttpDateClock {
    client: reqwest::Client,
    url: String,
}

impl HttpDateClock {
    pub fn new(url: impl Into<String>) -> anyhow::Result<Self> {
        Ok(Self {
            client: reqwest::Client::builder()
                .build()
                .context("failed to build the HTTP client for the time source")?,
            url: url.into(),
        })
    }
}

#[async_trait]
impl ReferenceClock for HttpDateClock {
    async fn now_millis(&self) -> anyhow::Result<u64> {
        let response = self.client.head(&self.url).send().await?;
        let date = response
            .headers()
            .get(reqwest::header::DATE)
            .context("time source sent no Date header")?
            .to_str()?;
        let parsed = chrono::DateTime::parse_from_rfc2822(date)
            .with_context(|| format!("time source sent an unparsable Date header: {date}"))?;
        Ok(parsed.timestamp_millis() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_drift_is_tolerated() {
        assert_eq!(excessive_drift(10_000, 10_250), None);
        assert_eq!(excessive_drift(10_250, 10_000), None);
    }

    #[test]
    fn large_drift_is_reported_in_either_direction() {
        assert_eq!(excessive_drift(10_000, 10_251), Some(251));
        assert_eq!(excessive_drift(10_251, 10_000), Some(251));
    }

    struct FixedClock(u64);

    #[async_trait]
    impl ReferenceClock for FixedClock {
        async fn now_millis(&self) -> anyhow::Result<u64> {
            Ok(self.0)
        }
    }

    #[tokio::test]
    async fn probing_never_fails() {
        // Warn-only: even a wildly wrong reference must not error.
        check_clock_drift(&FixedClock(0)).await;
    }
}
