//! Interactive chat application for Groq-hosted models.
//!
//! This binary provides a REPL interface that relays each prompt, together
//! with the conversation so far, to Groq's chat-completions API.
//!
//! # Usage
//!
//! ```bash
//! # Basic usage with default settings; prompts for the key if unset
//! GROQ_API_KEY=gsk_... groqchat
//!
//! # Specify a model
//! groqchat --model llama-3.1-8b-instant
//!
//! # Set a system prompt
//! groqchat --system "You are a helpful coding assistant"
//!
//! # Fetch whole replies and disable colors (useful for piping output)
//! groqchat --no-stream --no-color
//! ```
//!
//! Set `GROQCHAT_LOG` (e.g. `groqchat=debug`) to see diagnostics on stderr.
//!
//! # Commands
//!
//! While chatting, you can use slash commands:
//! - `/help` - Show available commands
//! - `/new` - Start a fresh conversation
//! - `/model <name>` - Change the model
//! - `/system [prompt]` - Set or clear system prompt
//! - `/stats` - Show session statistics
//! - `/quit` - Exit the application

use arrrg::CommandLine;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use groqchat::chat::{
    ChatArgs, ChatCommand, ChatConfig, PlainTextRenderer, Renderer, help_text, parse_command,
};
use groqchat::{ChatSession, Credential, Groq, Model};

/// Environment variable holding the API key.
const API_KEY_VAR: &str = "GROQ_API_KEY";

/// Environment variable holding the log filter.
const LOG_VAR: &str = "GROQCHAT_LOG";

/// Main entry point for the groqchat application.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_env(LOG_VAR).unwrap_or_else(|_| "warn".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let (args, _) = ChatArgs::from_command_line_relaxed("groqchat [OPTIONS]");
    let config = ChatConfig::from(args);
    let use_color = config.use_color;

    let client = Groq::with_options(config.base_url.clone(), None)?;
    tracing::debug!(base_url = %client.base_url(), "client ready");
    let mut renderer = PlainTextRenderer::with_color(use_color);
    let mut rl = DefaultEditor::new()?;

    let Some(credential) = obtain_credential(&mut rl, &mut renderer)? else {
        println!("Goodbye!");
        return Ok(());
    };
    let mut session = ChatSession::new(client, credential, config.completion_options());

    println!("Groq Chat (model: {})", session.model());
    println!("Type /help for commands, /quit to exit\n");

    loop {
        match rl.readline("You: ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(line);

                if let Some(cmd) = parse_command(line) {
                    match cmd {
                        ChatCommand::Quit => {
                            println!("Goodbye!");
                            break;
                        }
                        ChatCommand::New => {
                            session.restart();
                            renderer.print_info("Started a new conversation.");
                        }
                        ChatCommand::History => {
                            renderer.show_history(session.conversation());
                        }
                        ChatCommand::Help => {
                            for line in help_text().lines() {
                                println!("    {line}");
                            }
                        }
                        ChatCommand::Model(model_name) => {
                            let model: Model = model_name.as_str().into();
                            session.set_model(model);
                            renderer.print_info(&format!("Model changed to: {model_name}"));
                        }
                        ChatCommand::System(prompt) => {
                            session.set_system_prompt(prompt.clone());
                            match prompt {
                                Some(p) => {
                                    renderer.print_info(&format!("System prompt set to: {p}"))
                                }
                                None => renderer.print_info("System prompt cleared."),
                            }
                        }
                        ChatCommand::MaxTokens(value) => {
                            session.set_max_tokens(Some(value));
                            renderer.print_info(&format!("max_tokens set to {value}"));
                        }
                        ChatCommand::ClearMaxTokens => {
                            session.set_max_tokens(None);
                            renderer.print_info("max_tokens reset to provider default");
                        }
                        ChatCommand::Temperature(value) => {
                            session.set_temperature(Some(value));
                            renderer.print_info(&format!("temperature set to {value:.2}"));
                        }
                        ChatCommand::ClearTemperature => {
                            session.set_temperature(None);
                            renderer.print_info("temperature reset to model default");
                        }
                        ChatCommand::TopP(value) => {
                            session.set_top_p(Some(value));
                            renderer.print_info(&format!("top_p set to {value:.2}"));
                        }
                        ChatCommand::ClearTopP => {
                            session.set_top_p(None);
                            renderer.print_info("top_p reset to model default");
                        }
                        ChatCommand::Stream(on) => {
                            session.set_stream(on);
                            if on {
                                renderer.print_info("Streaming enabled.");
                            } else {
                                renderer.print_info("Streaming disabled.");
                            }
                        }
                        ChatCommand::Stats => {
                            print_stats(&session);
                        }
                        ChatCommand::ShowConfig => {
                            print_config(&session);
                        }
                        ChatCommand::Invalid(message) => {
                            renderer.print_error(&message);
                        }
                    }
                    continue;
                }

                match session.submit(line).await {
                    Ok(reply) => renderer.show_message(&reply),
                    Err(err) => renderer.print_error(&err.to_string()),
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!();
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("\nGoodbye!");
                break;
            }
            Err(err) => {
                renderer.print_error(&format!("Input error: {err}"));
                break;
            }
        }
    }

    Ok(())
}

/// Read the key from the environment, or ask until a non-blank one is given.
///
/// Returns `None` when the user closes input instead of answering.
fn obtain_credential(
    rl: &mut DefaultEditor,
    renderer: &mut PlainTextRenderer,
) -> Result<Option<Credential>, ReadlineError> {
    if let Ok(value) = std::env::var(API_KEY_VAR) {
        match Credential::new(value) {
            Ok(credential) => return Ok(Some(credential)),
            Err(_) => tracing::warn!("{API_KEY_VAR} is set but blank"),
        }
    }
    loop {
        match rl.readline("Groq API key: ") {
            Ok(line) => match Credential::new(line) {
                Ok(credential) => return Ok(Some(credential)),
                Err(_) => renderer.print_error("Please enter an API key to continue."),
            },
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => return Ok(None),
            Err(err) => return Err(err),
        }
    }
}

fn print_stats(session: &ChatSession<Groq>) {
    let stats = session.stats();
    println!("    Session Statistics:");
    println!("      Model: {}", stats.model);
    println!("      Messages: {}", stats.message_count);
    println!(
        "      Turns: {} ok / {} failed",
        stats.successful_turns, stats.failed_turns
    );
    println!(
        "      Total tokens: {} prompt / {} completion",
        stats.total_prompt_tokens, stats.total_completion_tokens
    );
    if let Some(usage) = stats.last_turn_usage {
        println!(
            "      Last turn tokens: {} prompt / {} completion",
            usage.prompt_tokens, usage.completion_tokens
        );
    }
}

fn print_config(session: &ChatSession<Groq>) {
    let options = session.options();
    println!("    Current Configuration:");
    println!("      Endpoint: {}", session.provider().base_url());
    println!("      Model: {}", options.model);
    println!(
        "      Max tokens: {}",
        options
            .max_tokens
            .map(|v| v.to_string())
            .unwrap_or_else(|| "default".to_string())
    );
    println!("      Temperature: {}", describe_float(options.temperature));
    println!("      Top-p: {}", describe_float(options.top_p));
    println!(
        "      Streaming: {}",
        if options.stream { "on" } else { "off" }
    );
    if let Some(prompt) = options.system_prompt.as_deref() {
        println!("      System prompt: {prompt}");
    } else {
        println!("      System prompt: (none)");
    }
}

fn describe_float(value: Option<f32>) -> String {
    value
        .map(|v| format!("{v:.2}"))
        .unwrap_or_else(|| "default".to_string())
}
