#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

mod args;

use std::io::Write;
use std::sync::Arc;

use anyhow::Context;
use args::{Args, AskArgs, Command};
use chorus_config::Config;
use chorus_llm::types::DeltaRole;
use chorus_llm::{
    AgentResult, CompletionClient, Conversation, Dispatcher, GenerationSettings, HttpTransport, ResponseMode, Session,
};
use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = Config::load(&args.config)?;
    chorus_telemetry::init(&config.log)?;

    tracing::debug!(config_path = %args.config.display(), "configuration loaded");

    match args.command {
        Command::Targets => {
            list_targets(&config);
            Ok(())
        }
        Command::Ask(ask_args) => ask(&config, ask_args).await,
    }
}

fn list_targets(config: &Config) {
    for (label, provider) in &config.providers {
        println!("{label}\t{}\t{}", provider.kind, provider.model);
    }
}

async fn ask(config: &Config, args: AskArgs) -> anyhow::Result<()> {
    let labels = if args.targets.is_empty() {
        let first = config.providers.keys().next().context("no providers configured")?;
        vec![first.clone()]
    } else {
        args.targets
    };

    let transport = Arc::new(HttpTransport::new(&config.http)?);
    let mut sessions = Vec::with_capacity(labels.len());
    for label in &labels {
        let provider = config
            .providers
            .get(label)
            .with_context(|| format!("unknown target '{label}'"))?;
        let client = CompletionClient::from_config(label, provider, transport.clone())
            .with_context(|| format!("target '{label}' is not usable"))?;
        sessions.push(Session::new(label.clone(), client));
    }
    let dispatcher = Dispatcher::new(sessions)?;

    let mut settings = GenerationSettings::from(&config.generation);
    if let Some(effort) = args.effort {
        settings = settings.with_reasoning_effort(effort);
    }
    let mode = if args.no_stream || !config.generation.stream {
        ResponseMode::Single
    } else {
        ResponseMode::Auto
    };
    let history = Conversation::new()
        .with_system_prompt(config.generation.system_prompt.clone())
        .prompt(args.prompt, Vec::new());

    let mut dispatch = dispatcher.dispatch(history, settings, mode);

    let canceller = dispatch.cancel_handle();
    tokio::spawn(async move {
        shutdown_signal().await;
        canceller.cancel();
    });

    let live = labels.len() == 1;
    while let Some((_, delta)) = dispatch.next_progress().await {
        if live {
            print_delta(delta.role, &delta.text)?;
        }
    }

    let results = dispatch.join().await;
    if live {
        println!();
    } else {
        for result in &results {
            print_result(result);
        }
    }

    let failed: Vec<_> = results.iter().filter(|r| r.error.is_some()).collect();
    if live && let Some(error) = failed.first().and_then(|r| r.error.as_ref()) {
        eprintln!("error: {error}");
    }
    if !failed.is_empty() {
        anyhow::bail!("{} of {} targets failed", failed.len(), results.len());
    }

    Ok(())
}

fn print_delta(role: DeltaRole, text: &str) -> std::io::Result<()> {
    if text.is_empty() {
        return Ok(());
    }
    match role {
        DeltaRole::Text => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(text.as_bytes())?;
            stdout.flush()
        }
        DeltaRole::Reasoning => {
            let mut stderr = std::io::stderr().lock();
            write!(stderr, "\x1b[2m{text}\x1b[0m")?;
            stderr.flush()
        }
    }
}

fn print_result(result: &AgentResult) {
    println!("== {} ({}) ==", result.provider_label, result.model_id);
    if !result.text.is_empty() {
        println!("{}", result.text);
    }
    if let Some(error) = &result.error {
        println!("[error] {error}");
    } else if result.cancelled {
        println!("[cancelled]");
    }
    println!();
}

/// Wait for a shutdown signal (`SIGINT` or `SIGTERM`)
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }

    tracing::info!("shutdown signal received, cancelling targets");
}
