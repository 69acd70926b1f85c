//! `fitcoach chat`: interactive or single-message chat with the coach.

use clap::Args;
use fitcoach_agent::{FitnessTeam, MemoryWriteBack, Runner, chat_loop, ingest_stored_sessions, spawn_event_logger};
use fitcoach_config::{API_KEY_ENV, AppConfig, ConfigError};
use fitcoach_core::event::EventBus;
use std::path::Path;
use std::sync::Arc;
use tokio::io::BufReader;

#[derive(Args, Default)]
pub struct ChatArgs {
    /// Send a single message instead of entering interactive mode
    #[arg(short, long)]
    pub message: Option<String>,

    /// User to chat as (defaults to session.user_id from config)
    #[arg(short, long)]
    pub user: Option<String>,

    /// Session to continue (defaults to a new one)
    #[arg(short, long)]
    pub session: Option<String>,

    /// Keep sessions in memory only; nothing is written to disk
    #[arg(long)]
    pub ephemeral: bool,
}

fn missing_key_help() {
    eprintln!();
    eprintln!("  ERROR: No API key configured!");
    eprintln!();
    eprintln!("  Set the {API_KEY_ENV} environment variable, or put it in a .env file:");
    eprintln!("    {API_KEY_ENV}=...");
    eprintln!();
    eprintln!("  Or add `api_key = \"...\"` to your config file:");
    eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
    eprintln!();
}

pub async fn run(config_path: Option<&Path>, args: ChatArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(config_path)?;

    let providers = match fitcoach_providers::build_from_config(&config) {
        Ok(p) => p,
        Err(ConfigError::MissingApiKey) => {
            missing_key_help();
            return Err("No API key found. See above for setup instructions.".into());
        }
        Err(e) => return Err(e.into()),
    };

    let user_id = args.user.unwrap_or_else(|| config.session.user_id.clone());
    let session_id = args
        .session
        .or_else(|| config.session.session_id.clone())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let memory = fitcoach_memory::from_config(&config.memory);
    let sessions = fitcoach_session::open(&config.session, args.ephemeral).await?;

    match ingest_stored_sessions(sessions.as_ref(), memory.as_ref(), &config.app_name, &user_id).await {
        Ok(n) if n > 0 => tracing::info!(sessions = n, "Loaded earlier sessions into memory"),
        Ok(_) => {}
        Err(e) => tracing::warn!(error = %e, "Could not load earlier sessions into memory"),
    }

    let coordinator = Arc::new(FitnessTeam::new(&config, providers, memory.clone()).build());
    let events = Arc::new(EventBus::default());
    let event_log = spawn_event_logger(&events);
    let runner = Runner::new(&config.app_name, coordinator, sessions.clone(), events)
    .with_hook(Arc::new(MemoryWriteBack::new(memory, config.memory.write_back)));

    tracing::info!(
        user = %user_id,
        session = %session_id,
        model = %config.models.root,
        store = sessions.name(),
        "Coach ready"
    );

    let result: Result<(), Box<dyn std::error::Error>> = match args.message {
        Some(msg) => match runner.run_turn(&user_id, &session_id, &msg).await {
            Ok(outcome) => {
                println!("{} > {}", runner.coordinator_name(), outcome.reply);
                Ok(())
            }
            Err(e) => Err(e.into()),
        },
        None => {
            let stdin = BufReader::new(tokio::io::stdin());
            let mut stdout = std::io::stdout();
            chat_loop(&runner, &user_id, &session_id, stdin, &mut stdout)
                .await
                .map(|turns| tracing::debug!(turns, "Chat ended"))
                .map_err(Into::into)
        }
    };

    drop(runner);
    match event_log.await {
        Ok(tally) => tracing::debug!(?tally, "Event log drained"),
        Err(e) => tracing::warn!(error = %e, "Event logger stopped early"),
    }
    sessions.close().await;
    if !args.ephemeral {
        eprintln!("  Session: {session_id} (resume with --session {session_id})");
    }
    result
}
