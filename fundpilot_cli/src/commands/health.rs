use anyhow::{bail, Result};

use crate::commands::Context;
use crate::output::{print_json, OutputFormat};

pub async fn run(ctx: &Context, format: &OutputFormat) -> Result<()> {
    let base_url = &ctx.client.config().base_url;
    let healthy = ctx.client.check_health().await;

    match format {
        OutputFormat::Json => print_json(&serde_json::json!({
            "baseUrl": base_url,
            "healthy": healthy,
        })),
        _ => println!(
            "{} {}",
            base_url,
            if healthy { "is healthy" } else { "is unreachable" }
        ),
    }

    if !healthy {
        bail!("health check failed for {}", base_url);
    }
    Ok(())
}
