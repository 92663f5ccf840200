//! Chat command - Interactive chat against an Ollama model.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use hwy_chat::{
    format_model_name, ChatError, ChatResult, ChatTransport, Conversation, ConversationEvent,
    MessageRole, ModelInfo, OllamaClient, SendOptions, StreamOutcome, StreamingChatConsumer,
};

use crate::commands::analyze::{gemini_tracker, ingest_files, print_report};
use crate::settings::Settings;

const GREETING: &str = "Hello! I can help with highway engineering questions and with the \
documents you load. What would you like to know?";

#[derive(Args)]
pub struct ChatArgs {
    /// Model to chat with (defaults to the configured or first installed model)
    #[arg(short, long)]
    model: Option<String>,

    /// Sampling temperature between 0 and 1
    #[arg(short, long)]
    temperature: Option<f32>,

    /// Maximum number of tokens per answer
    #[arg(long)]
    max_tokens: Option<u32>,

    /// Wait for whole answers instead of streaming them
    #[arg(long)]
    no_stream: bool,

    /// PDF to analyse and use as context (repeatable)
    #[arg(long = "doc", value_name = "FILE")]
    docs: Vec<PathBuf>,
}

/// Pick the requested model, falling back to the first installed one.
fn select_model(requested: Option<&str>, models: &[ModelInfo]) -> Result<String> {
    match requested {
        Some(name) => {
            if !models.iter().any(|m| m.name == name) {
                warn!(model = name, "Model is not installed on the server");
            }
            Ok(name.to_string())
        }
        None => models
            .first()
            .map(|m| m.name.clone())
            .context("No models installed. Pull one with `ollama pull llama2`."),
    }
}

/// Print assistant text for one turn as it arrives.
///
/// Resolves to the number of bytes printed once the turn's placeholder is
/// finished or removed.
fn spawn_printer(conversation: Conversation) -> JoinHandle<usize> {
    let mut events = conversation.subscribe();
    tokio::spawn(async move {
        let mut target = None;
        let mut printed = 0;
        loop {
            let event = match events.recv().await {
                Ok(event) => event,
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => break,
            };
            match event {
                ConversationEvent::MessageAppended {
                    message_id,
                    role: MessageRole::Assistant,
                } if target.is_none() => target = Some(message_id),
                ConversationEvent::MessageUpdated { message_id, .. }
                    if target.as_ref() == Some(&message_id) =>
                {
                    if let Some(message) = conversation.get(&message_id) {
                        if let Some(delta) = message.content.get(printed..) {
                            print!("{}", delta);
                            let _ = std::io::stdout().flush();
                            printed = message.content.len();
                        }
                    }
                }
                ConversationEvent::StreamFinished { message_id, .. }
                | ConversationEvent::MessageRemoved { message_id }
                    if target.as_ref() == Some(&message_id) =>
                {
                    break
                }
                _ => {}
            }
        }
        printed
    })
}

async fn run_turn(
    consumer: &StreamingChatConsumer<OllamaClient>,
    text: &str,
    options: &SendOptions,
    stream: bool,
) -> ChatResult<StreamOutcome> {
    let mut printer = spawn_printer(consumer.conversation().clone());

    let send = async {
        if stream {
            consumer.send(text, options).await
        } else {
            consumer.send_complete(text, options).await
        }
    };
    tokio::pin!(send);

    let result = loop {
        tokio::select! {
            result = &mut send => break result,
            _ = tokio::signal::ctrl_c() => {
                if consumer.cancel() {
                    info!("Cancellation requested");
                }
            }
        }
    };

    let printed = if matches!(result, Err(ChatError::Validation(_))) {
        // Rejected before any placeholder was created
        printer.abort();
        0
    } else {
        match tokio::time::timeout(Duration::from_secs(1), &mut printer).await {
            Ok(Ok(printed)) => printed,
            _ => {
                printer.abort();
                0
            }
        }
    };

    if let Ok(outcome) = &result {
        if let Some(rest) = outcome.content().get(printed..) {
            print!("{}", rest);
        }
        if outcome.is_cancelled() {
            print!(" [cancelled]");
        }
        println!();
    }
    result
}

pub async fn execute(args: ChatArgs, mut settings: Settings) -> Result<()> {
    if let Some(model) = args.model {
        settings.default_model = Some(model);
    }
    if let Some(temperature) = args.temperature {
        settings.temperature = Some(temperature);
    }
    if let Some(max_tokens) = args.max_tokens {
        settings.max_tokens = Some(max_tokens);
    }

    let client = Arc::new(OllamaClient::new(settings.ollama_config())?);
    let base_url = client.config().base_url.clone();
    let consumer = StreamingChatConsumer::new(client.clone(), Conversation::with_greeting(GREETING));

    let models = consumer
        .load_models(&base_url)
        .await
        .with_context(|| format!("Cannot chat without a reachable Ollama server at {}", base_url))?;
    let model = select_model(settings.default_model.as_deref(), &models)?;

    let system_context = if args.docs.is_empty() {
        None
    } else {
        let tracker = gemini_tracker(&settings)?;
        println!("📄 Loading {} document(s)...", args.docs.len());
        for report in ingest_files(&tracker, &args.docs).await {
            print_report(&report);
        }
        tracker.chat_context()
    };

    // Sampling parameters come from the client config defaults
    let options = SendOptions::new(model.clone()).system_context(system_context);

    println!();
    println!("🤖 {} ({})", format_model_name(&model), model);
    println!("   /new starts over, /quit exits, Ctrl-C stops an answer");
    println!();
    println!("{}", GREETING);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("\n> ");
        let _ = std::io::stdout().flush();

        let Some(line) = lines.next_line().await.context("Failed to read input")? else {
            break;
        };
        let line = line.trim();

        match line {
            "" => continue,
            "/quit" | "/exit" => break,
            "/new" => {
                consumer.reset(Some(GREETING.to_string()));
                println!("{}", GREETING);
                continue;
            }
            _ => {}
        }

        match run_turn(&consumer, line, &options, !args.no_stream).await {
            Ok(_) => {}
            Err(e @ ChatError::Validation(_)) => println!("⚠️  {}", e),
            Err(e) => {
                println!();
                eprintln!("❌ {}", e);
                if !client.check_health().await {
                    eprintln!("🔴 Lost connection to {}", base_url);
                }
            }
        }
    }

    Ok(())
}
