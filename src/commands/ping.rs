//! `ping` command: reach the API through the full fallback machinery

use anyhow::Result;

use crate::client::Orchestrator;
use crate::config::Config;

use super::{build_cache, build_catalog};

/// Ping the API, walking the endpoint catalog until one route answers
pub async fn ping() -> Result<()> {
    let config = Config::from_env();
    let catalog = build_catalog(&config)?;
    let cache = build_cache(&config);

    let orchestrator = Orchestrator::new(catalog, cache, config.attempt_timeout())?;

    match orchestrator.ping().await {
        Ok(response) => {
            println!("ok: HTTP {} from {}", response.status(), response.url());
        }
        Err(e) => {
            eprintln!("{}", e.diagnosis.message());
            for record in &e.attempts {
                eprintln!(
                    "  [{}] {} -> {} ({} ms)",
                    record.label, record.url, record.error, record.elapsed_ms
                );
            }
            anyhow::bail!("every endpoint and retry round exhausted");
        }
    }

    Ok(())
}
