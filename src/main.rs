//! Interactive OSCE session in the terminal.
//!
//! Reads student utterances from stdin, one per line, and prints the
//! simulated patient's replies. `/status` shows progress; `/end` or EOF
//! ends the session and prints token usage.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;

use osce_simulator::adapters::ai::{OpenAIConfig, OpenAIProvider};
use osce_simulator::adapters::case::FileCaseRepository;
use osce_simulator::adapters::session::InMemorySessionStore;
use osce_simulator::application::{
    EndSessionCommand, EndSessionHandler, EngineProviders, GetSessionStatusHandler,
    GetSessionStatusQuery, SendMessageCommand, SendMessageHandler, SessionReaper, SessionStore,
    StartSessionCommand, StartSessionHandler,
};
use osce_simulator::config::{AppConfig, LogFormat};
use osce_simulator::domain::foundation::{CaseId, StudentId};
use osce_simulator::ports::CaseRepository;

/// Run a simulated-patient OSCE station from the terminal
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Case to run (file stem in the case directory)
    case_id: Option<String>,

    /// Student identifier recorded with the session
    #[arg(short, long)]
    student: Option<String>,

    /// Pin the sampling seed regardless of configuration
    #[arg(long)]
    exam: bool,

    /// List available cases and exit
    #[arg(long)]
    list_cases: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = AppConfig::load().context("Failed to load configuration")?;

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.server.log_level));
    match config.server.log_format {
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
    }

    let cases: Arc<dyn CaseRepository> = Arc::new(FileCaseRepository::new(&config.session.case_dir));
    if args.list_cases {
        for case_id in cases.list().await? {
            println!("{}", case_id);
        }
        return Ok(());
    }

    config.validate().context("Invalid configuration")?;
    let case_id = args
        .case_id
        .context("A case id is required (see --list-cases)")?;
    let case_id = CaseId::new(case_id)?;
    let student_id = args.student.map(StudentId::new).transpose()?;

    let api_key = config
        .ai
        .openai_api_key
        .clone()
        .context("OSCE_SIM__AI__OPENAI_API_KEY is not configured")?;
    let provider = OpenAIProvider::new(
        OpenAIConfig::from_secret(api_key)
            .with_base_url(config.ai.base_url.clone())
            .with_timeout(config.ai.timeout())
            .with_max_retries(config.ai.max_retries),
    )?;
    let providers = EngineProviders::shared(Arc::new(provider));

    let mut engine_config = config.engine_config();
    engine_config.exam_mode |= args.exam;

    let sessions = Arc::new(InMemorySessionStore::new());
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let reaper = SessionReaper::with_config(sessions.clone(), config.session.reaper_config());
    let reaper_task = tokio::spawn(async move { reaper.run(shutdown_rx).await });

    let started = StartSessionHandler::new(cases, sessions.clone(), providers, engine_config)
        .handle(StartSessionCommand {
            case_id,
            student_id,
        })
        .await?;
    println!("== {} ({}) ==", started.case_title, started.case_id);

    let send = SendMessageHandler::new(sessions.clone());
    let status = GetSessionStatusHandler::new(sessions.clone());
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        match line {
            "" => continue,
            "/end" => break,
            "/status" => {
                let snapshot = status
                    .handle(GetSessionStatusQuery {
                        session_id: started.session_id,
                    })
                    .await?;
                println!(
                    "[{} turns, {} of {} additional questions asked, {} tokens]",
                    snapshot.turn_count,
                    snapshot.asked_count,
                    snapshot.asked_count + snapshot.remaining_count,
                    snapshot.usage.total_tokens
                );
                continue;
            }
            _ => {}
        }

        let result = send
            .handle(SendMessageCommand {
                session_id: started.session_id,
                utterance: line.to_string(),
            })
            .await;
        match result {
            Ok(result) => println!("{}", result.reply.text),
            Err(err) => {
                // The reaper may have ended an idle session.
                eprintln!("{}", err);
                if sessions.get(started.session_id).await.is_err() {
                    break;
                }
            }
        }
    }

    if let Ok(ended) = EndSessionHandler::new(sessions.clone())
        .handle(EndSessionCommand {
            session_id: started.session_id,
        })
        .await
    {
        println!(
            "== ended after {} turns: chat tokens {} (in {}, out {}), auxiliary tokens {} ==",
            ended.turn_count,
            ended.usage.total_tokens,
            ended.usage.input_tokens,
            ended.usage.output_tokens,
            ended.auxiliary_usage.total_tokens
        );
    }

    shutdown_tx.send(true).ok();
    reaper_task.await?;
    Ok(())
}
