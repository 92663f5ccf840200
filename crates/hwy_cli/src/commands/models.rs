//! Models command - Check the server and list installed models.

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use hwy_chat::{format_model_name, ChatError, ChatTransport, ModelOption, OllamaClient};

use crate::settings::Settings;

#[derive(Args)]
pub struct ModelsArgs {
    /// Ollama server URL
    #[arg(long)]
    url: Option<String>,

    /// Run a short generation against each model
    #[arg(long)]
    test: bool,
}

pub async fn execute(args: ModelsArgs, mut settings: Settings) -> Result<()> {
    if let Some(url) = args.url {
        settings.ollama_base_url = Some(url);
    }

    let client = OllamaClient::new(settings.ollama_config())?;
    let base_url = client.config().base_url.clone();
    info!("Checking Ollama server at {}", base_url);

    if !client.check_health().await {
        println!("🔴 Disconnected from {}", base_url);
        return Err(ChatError::NotConnected(base_url)).context("Ollama server is not reachable");
    }
    println!("🟢 Connected to {}", base_url);

    let models = client
        .list_models()
        .await
        .context("Failed to list models")?;

    if models.is_empty() {
        println!("   ⚠️  No models installed. Pull one with `ollama pull llama2`.");
        return Ok(());
    }

    println!();
    println!("📦 {} model(s) available:", models.len());
    for model in &models {
        let option = ModelOption::from(model);
        println!("   • {} ({})", option.display_name, option.id);
        println!("     {}", option.description);
    }

    if args.test {
        println!();
        println!("🧪 Testing models...");
        let mut failed = 0;
        for model in &models {
            if client.test_model(&model.name).await {
                println!("   ✅ {}", format_model_name(&model.name));
            } else {
                failed += 1;
                println!("   ❌ {}", format_model_name(&model.name));
            }
        }
        if failed > 0 {
            anyhow::bail!("{} of {} models failed the test", failed, models.len());
        }
    }

    Ok(())
}
