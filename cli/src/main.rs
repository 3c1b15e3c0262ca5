use std::io::{Read, Write};
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::Parser;

use bridge_core::{collect_all, Config, Role, SummaryEvent, Summarizer};

#[derive(Parser, Debug)]
#[command(name = "bridge")]
#[command(about = "Summarize technical text for Developer, PM, and Support audiences")]
struct Args {
    /// Summarize for a single role (developer, pm, support) and stream the
    /// output as it is generated; all three roles when omitted
    #[arg(long)]
    role: Option<String>,

    /// File containing the text to summarize; reads stdin when omitted
    input: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("bridge=info".parse().expect("valid directive")),
        )
        .init();

    let args = Args::parse();
    let text = read_input(&args)?;

    let config = Config::from_env();
    if !config.embedding_configured() || !config.store_configured() {
        tracing::info!("retrieval not configured; summaries will be ungrounded");
    }
    let summarizer = Summarizer::new(&config);

    match &args.role {
        Some(name) => {
            let role = Role::parse(name).ok_or_else(|| {
                anyhow!("unknown role: {name} (expected developer, pm, or support)")
            })?;
            stream_one(&summarizer, &text, role).await
        }
        None => summarize_all(&summarizer, &text).await,
    }
}

fn read_input(args: &Args) -> Result<String> {
    match &args.input {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display())),
        None => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("failed to read stdin")?;
            Ok(text)
        }
    }
}

/// Stream a single role's summary to stdout as fragments arrive.
async fn stream_one(summarizer: &Summarizer, text: &str, role: Role) -> Result<()> {
    let mut stream = summarizer.summarize_role(text, role)?;
    let mut stdout = std::io::stdout();

    while let Some(event) = stream.next_event().await {
        match event {
            SummaryEvent::Fragment { text } => {
                stdout.write_all(text.as_bytes())?;
                stdout.flush()?;
            }
            SummaryEvent::Completed => {
                stdout.write_all(b"\n")?;
                return Ok(());
            }
            SummaryEvent::Failed { failure } => {
                return Err(anyhow!("{role} summary failed: {failure}"));
            }
        }
    }
    Err(anyhow!("{role} stream ended without a terminal event"))
}

/// Run all three role pipelines concurrently and print each section once
/// its stream terminates. Partial success is reported per role.
async fn summarize_all(summarizer: &Summarizer, text: &str) -> Result<()> {
    let streams = summarizer.summarize_all(text)?;
    let result = collect_all(streams).await;

    let mut any_failed = false;
    for role in Role::ALL {
        println!("== {role} ==");
        match result.text(role) {
            Some(summary) => println!("{summary}\n"),
            None => {
                any_failed = true;
                if let Some(failure) = result.failure(role) {
                    eprintln!("error: {failure}\n");
                }
            }
        }
    }

    if any_failed {
        std::process::exit(1);
    }
    Ok(())
}
