//! recall-play: play RECALL memory tasks in the terminal.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use recall_core::engine::{EngineEvent, Submission};
use recall_core::types::Phase;
use recall_core::{Catalog, Payload, Presentation, RecallConfig, Response, RoundToken, TaskOutcome};
use recall_host::telemetry::init_tracing;
use recall_host::{
    Host, JsonProgressStore, SessionEvent, SqliteResultsStore, StaticAuth, StaticPayments, VisitorId,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

#[derive(Parser)]
#[command(name = "recall-play", version, about = "Short-term memory tasks in your terminal")]
struct Cli {
    /// Config file path (recall.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Who is playing; progress and results are kept per visitor
    #[arg(long, default_value = "local")]
    visitor: String,

    /// Treat the visitor as a premium subscriber
    #[arg(long)]
    premium: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List tasks and whether they are unlocked
    List,

    /// Play one task
    Play {
        /// Task id (see `list`)
        task: String,

        /// Seed for reproducible stimuli
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Show stored results
    History,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => RecallConfig::from_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => RecallConfig::default(),
    };
    init_tracing(&config.general)?;

    let visitor = VisitorId::new(cli.visitor.clone());
    let payments = if cli.premium {
        StaticPayments::unrestricted()
    } else {
        StaticPayments::new()
    };
    let host = Host::new(
        Arc::new(Catalog::standard(&config)?),
        Arc::new(StaticAuth::new().with_session(visitor.as_str(), visitor.clone())),
        Arc::new(payments),
        Arc::new(JsonProgressStore::open(&config.progress.path)),
        Arc::new(
            SqliteResultsStore::open(&config.results.db_path, &config.results)
                .context("opening results database")?,
        ),
    );

    match cli.command {
        Commands::List => list(&host, &visitor),
        Commands::History => history(&host, &visitor),
        Commands::Play { task, seed } => play(&host, &visitor, &task, seed).await,
    }
}

fn list(host: &Host, visitor: &VisitorId) -> anyhow::Result<()> {
    let tracker = host.tracker(visitor)?;
    for (level, task) in host.catalog().iter().enumerate() {
        let status = if !tracker.is_unlocked(task.id.as_str()) {
            "locked"
        } else if task.premium && !host.has_premium(visitor) {
            "premium"
        } else {
            "open"
        };
        let best = host
            .results()
            .best_score(visitor.as_str(), &task.id)?
            .map_or_else(|| "-".to_string(), |s| s.to_string());
        println!("{level:>2}  {:<22} {:<8} best {best}", task.id, status);
    }
    Ok(())
}

fn history(host: &Host, visitor: &VisitorId) -> anyhow::Result<()> {
    let results = host.results().results_for(visitor.as_str())?;
    if results.is_empty() {
        println!("No results yet for {visitor}.");
    }
    for stored in results {
        println!(
            "{}  {:<22} {:>3}",
            stored.recorded_at.format("%Y-%m-%d %H:%M"),
            stored.record.task_id,
            stored.record.score
        );
    }
    Ok(())
}

async fn play(host: &Host, visitor: &VisitorId, task: &str, seed: Option<u64>) -> anyhow::Result<()> {
    let launched = match seed {
        Some(seed) => host.launch_seeded(visitor.as_str(), task, seed)?,
        None => host.launch(visitor.as_str(), task)?,
    };
    let definition = launched.definition;
    let handle = launched.session.handle;
    let mut events = launched.session.events;
    let manual = definition.timing.presentation == Presentation::Manual;

    let (line_tx, mut lines) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        let mut stdin = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = stdin.next_line().await {
            if line_tx.send(line).is_err() {
                break;
            }
        }
    });

    println!("{} ({} rounds)", definition.title, definition.round_count);
    handle.start().await?;

    let mut token = RoundToken(0);
    let mut phase = Phase::Idle;
    let mut payload: Option<Payload> = None;

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { bail!("session ended unexpectedly") };
                match event {
                    SessionEvent::Engine(EngineEvent::RoundStarted { token: t, round_index, stimulus }) => {
                        token = t;
                        println!("\nRound {}/{}", round_index + 1, definition.round_count);
                        println!("{}", render(&stimulus.payload));
                        payload = Some(stimulus.payload);
                    }
                    SessionEvent::Engine(EngineEvent::PhaseChanged { phase: p, .. }) => {
                        phase = p;
                        match p {
                            Phase::Presenting if manual => println!("(press Enter once memorised)"),
                            Phase::Memorizing => print!("\x1b[2J\x1b[H"),
                            Phase::AwaitingInput => {
                                if let Some(payload) = &payload {
                                    println!("{}", prompt(payload));
                                }
                            }
                            _ => {}
                        }
                    }
                    SessionEvent::Engine(EngineEvent::RoundComplete(result)) => {
                        let verdict = if result.correct { "Correct" } else { "Not quite" };
                        let timeout = if result.timed_out { " (time up)" } else { "" };
                        println!(
                            "{verdict}{timeout}: {}/{} items, score {}",
                            result.correct_items, result.total_items, result.score
                        );
                    }
                    SessionEvent::Engine(EngineEvent::TaskComplete(outcome)) => summarize(&outcome),
                    SessionEvent::Engine(EngineEvent::TaskPassed(_)) => {}
                    SessionEvent::Recorded { unlocked_level, .. } => {
                        if let Some(level) = unlocked_level {
                            if let Some(next) = host.catalog().at(level) {
                                println!("Unlocked: {}", next.title);
                            }
                        }
                        break;
                    }
                    SessionEvent::Failed { message } => bail!("session failed: {message}"),
                }
            }
            line = lines.recv() => {
                let Some(line) = line else { break };
                match phase {
                    Phase::Presenting | Phase::RoundComplete => {
                        handle.ready().await?;
                    }
                    Phase::AwaitingInput => {
                        let submitted = handle.submit(token, Response::Text(line)).await?;
                        if submitted != Submission::Accepted {
                            println!("(too late, that round is over)");
                        }
                    }
                    _ => {}
                }
            }
        }
    }

    handle.unmount().await;
    Ok(())
}

fn render(payload: &Payload) -> String {
    match payload {
        Payload::Symbols { symbols } => symbols
            .iter()
            .map(char::to_string)
            .collect::<Vec<_>>()
            .join("  "),
        Payload::Grid { size, active } => (0..*size)
            .map(|row| {
                (0..*size)
                    .map(|col| if active.contains(&(row * size + col)) { "##" } else { ".." })
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect::<Vec<_>>()
            .join("\n"),
        Payload::Words { category, words } => format!("{category}: {}", words.join(", ")),
        Payload::Colors { colors } => colors.join(" -> "),
        Payload::Pairs { pairs } => pairs
            .iter()
            .map(|(cue, target)| format!("{cue} - {target}"))
            .collect::<Vec<_>>()
            .join("\n"),
        Payload::Stream { items, .. } => items
            .iter()
            .enumerate()
            .map(|(i, c)| format!("{i}:{c}"))
            .collect::<Vec<_>>()
            .join(" "),
    }
}

fn prompt(payload: &Payload) -> String {
    match payload {
        Payload::Symbols { .. } => "Type the sequence:".to_string(),
        Payload::Grid { size, .. } => format!(
            "Which cells were lit? Numbers 0-{}, row by row from the top left:",
            size * size - 1
        ),
        Payload::Words { category, .. } => format!("List the {category} you saw, comma-separated:"),
        Payload::Colors { .. } => "List the colors in order, comma-separated:".to_string(),
        Payload::Pairs { pairs } => format!(
            "Give the partner of each word, comma-separated: {}",
            pairs.iter().map(|(cue, _)| cue.as_str()).collect::<Vec<_>>().join(", ")
        ),
        Payload::Stream { n, .. } => format!("Which positions matched the letter {n} back?"),
    }
}

fn summarize(outcome: &TaskOutcome) {
    println!(
        "\n{} with {} of {} rounds correct, final score {}",
        if outcome.passed { "Passed" } else { "Not passed" },
        outcome.correct_rounds,
        outcome.round_results.len(),
        outcome.final_score
    );
}
