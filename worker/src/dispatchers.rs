use anyhow::Context;
use async_trait::async_trait;
use gust_runner::prelude::{Dispatcher, Script};
use tokio::sync::mpsc::UnboundedSender;

/// How sub-scripts reach the rest of the fleet.
pub enum PeerDispatcher {
    /// Single-worker operation: sub-scripts loop back into this process and
    /// each one re-enters the orchestrator as a fresh invocation.
    Loopback(UnboundedSender<Script>),
    /// Distributed operation: sub-scripts are POSTed, unchanged, to the peer
    /// fleet.
    Http { client: reqwest::Client, url: String },
}

impl PeerDispatcher {
    pub fn loopback(queue: UnboundedSender<Script>) -> Self {
        Self::Loopback(queue)
    }

    /// Target peers of the given deployment stage behind `peer_base`.
    pub fn http(peer_base: &str, stage: &str) -> anyhow::Result<Self> {
        Ok(Self::Http {
            client: reqwest::Client::builder()
                .build()
                .context("failed to build the peer HTTP client")?,
            url: format!("{}/{stage}/run", peer_base.trim_end_matches('/')),
        })
    }
}

#[async_trait]
impl Dispatcher for PeerDispatcher {
    async fn dispatch(&self, script: Script) -> anyhow::Result<()> {
        match self {
            PeerDispatcher::Loopback(queue) => queue
                .send(script)
                .map_err(|_| anyhow::anyhow!("the loopback queue is closed")),
            PeerDispatcher::Http { client, url } => {
                client
                    .post(url)
                    .json(&script)
                    .send()
                    .await
                    .and_then(|response| response.error_for_status())
                    .with_context(|| format!("peer at {url} refused the sub-script"))?;
                Ok(())
            }
        }
    }
}
