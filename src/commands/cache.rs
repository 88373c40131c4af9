//! `cache` command: inspect or reset the persisted resolution cache

use anyhow::Result;
use chrono::Utc;

use crate::config::Config;

use super::build_cache;

/// Print every cached hostname→IP mapping with its remaining lifetime
pub async fn cache_show() -> Result<()> {
    let config = Config::from_env();
    let cache = build_cache(&config);

    let snapshot = cache.snapshot().await;
    if snapshot.is_empty() {
        println!("resolution cache is empty");
        return Ok(());
    }

    let now_ms = Utc::now().timestamp_millis();
    for (hostname, entry) in &snapshot {
        let expires_in_ms = entry.recorded_at + entry.ttl_ms as i64 - now_ms;
        if expires_in_ms > 0 {
            println!(
                "{hostname} -> {} (expires in {}s)",
                entry.ip_address,
                expires_in_ms / 1000
            );
        } else {
            println!("{hostname} -> {} (expired)", entry.ip_address);
        }
    }

    Ok(())
}

/// Drop every cached mapping
pub async fn cache_clear() -> Result<()> {
    let config = Config::from_env();
    let cache = build_cache(&config);

    cache.clear().await;
    println!("resolution cache cleared");

    Ok(())
}
