//! Keep-Alive Pinger
//!
//! Free-tier hosts idle out without inbound traffic. When a keepalive URL is
//! configured, ping it once a minute and log the outcome. Failures never
//! affect the daemon.

use std::time::Duration;

const PING_INTERVAL: Duration = Duration::from_secs(60);
const PING_TIMEOUT: Duration = Duration::from_secs(20);

/// Spawn the background ping loop.
pub fn spawn(url: String) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let client = match reqwest::Client::builder()
            .timeout(PING_TIMEOUT)
            .danger_accept_invalid_certs(true)
            .build()
        {
            Ok(client) => client,
            Err(e) => {
                tracing::error!("Keep-alive disabled, client build failed: {}", e);
                return;
            }
        };

        loop {
            match client.get(&url).send().await {
                Ok(resp) => {
                    tracing::info!("Keep-alive ping successful. Status: {}", resp.status())
                }
                Err(e) => tracing::warn!("Keep-alive ping failed: {}", e),
            }
            tokio::time::sleep(PING_INTERVAL).await;
        }
    })
}
