//! `status` command: run the health prober and print the report

use anyhow::Result;

use crate::config::Config;
use crate::health::HealthProber;

use super::build_catalog;

/// Probe API reachability and print the classification
pub async fn status(json: bool) -> Result<()> {
    let config = Config::from_env();
    let catalog = build_catalog(&config)?;
    let prober = HealthProber::new(catalog, config.probe.clone())?;

    let report = prober.probe().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("status:    {}", report.status.as_str());
        println!("primary:   {}", report.primary_available);
        println!("fallback:  {}", report.fallback_available);
        println!("latency:   {} ms", report.latency_ms);
        println!("message:   {}", report.message);
        println!("timestamp: {}", report.timestamp);
    }

    Ok(())
}
