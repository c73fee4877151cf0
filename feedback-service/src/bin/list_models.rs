//! Print the Gemini models available to the configured API key.

use anyhow::{bail, Context, Result};
use feedback_common::config::Config;
use feedback_common::logging::init_logging;
use feedback_service::GeminiProvider;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load_with_env()?;
    init_logging(
        &config.observability.log_level,
        &config.observability.log_format,
    );

    let Some(api_key) = config
        .secrets
        .gemini_api_key
        .as_deref()
        .filter(|k| !k.trim().is_empty())
    else {
        bail!("GEMINI_API_KEY is not set");
    };

    let provider = GeminiProvider::new(api_key.trim(), &config.llm)
        .map_err(|e| anyhow::anyhow!("{}", e))?;

    let models = provider
        .list_models()
        .await
        .map_err(|e| anyhow::anyhow!("{}", e))
        .context("Failed to list models")?;

    println!("Models supporting generateContent:");
    for name in &models {
        println!("  {}", name);
    }
    tracing::info!(count = models.len(), "Listed models");

    Ok(())
}
