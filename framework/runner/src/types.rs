/// Recommended error type for a worker `main` function and any glue code
/// around the orchestrator. Compatible with everything in this crate that
/// returns `anyhow::Result`, so `?` propagates throughout.
pub type GustResult<T> = anyhow::Result<T>;
