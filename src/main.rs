use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use clap::{Parser, Subcommand};
use crossterm::event::KeyEventKind;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::prelude::*;

mod ai;
mod app;
mod config;
mod db;
mod error;
mod models;
mod proxy;
mod services;
mod store;
#[cfg(test)]
mod test_support;
mod tui;

use app::App;
use config::Config;
use error::{AppError, Result};
use models::{calculate_stats, Difficulty, Language};
use services::{
    restore_session, AnalysisService, AuthClient, Backend, JudgeClient, ProblemService,
    SessionStore, SignUpOutcome,
};
use tui::{draw, handle_key_event};

#[derive(Debug, Parser)]
#[command(name = "leet-tracker", version, about = "Track LeetCode practice progress")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Open the interactive tracker (default)
    Tui,
    /// Sign in with email and password
    Login {
        email: String,
        #[arg(long, env = "LEET_TRACKER_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Create an account
    Signup {
        username: String,
        email: String,
        #[arg(long, env = "LEET_TRACKER_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Forget the stored session
    Logout,
    /// Serve the LeetCode lookup proxy
    Proxy {
        #[arg(long, short)]
        port: Option<u16>,
    },
    /// Print progress statistics
    Stats,
    /// Search problems by title or category
    Search { query: String },
    /// Show one problem with its stored AI analyses
    Show { id: String },
    /// Run a source file through the code judge
    Run {
        file: PathBuf,
        /// javascript, python, java or cpp; guessed from the extension when omitted
        #[arg(long, short)]
        language: Option<String>,
    },
}

fn init_tracing(default_directive: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_directive)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn session_store() -> SessionStore {
    SessionStore::new(config::data_dir().join("session.json"))
}

fn auth_client(config: &Config) -> Result<AuthClient> {
    let (url, anon_key) = config.supabase()?;
    AuthClient::new(url, anon_key)
}

fn read_password(password: Option<String>) -> Result<String> {
    if let Some(password) = password {
        return Ok(password);
    }
    print!("Password: ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    let password = line.trim_end_matches(['\r', '\n']).to_string();
    if password.is_empty() {
        return Err(AppError::Auth("Password is required".to_string()));
    }
    Ok(password)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Command::Tui);

    // The TUI owns the terminal, so only warnings reach stderr there
    match command {
        Command::Tui => init_tracing("warn"),
        _ => init_tracing("leet_tracker=info"),
    }

    let config = Config::load()?;

    match command {
        Command::Tui => run_tui(&config).await,
        Command::Login { email, password } => {
            let password = read_password(password)?;
            let session = auth_client(&config)?.sign_in(&email, &password).await?;
            let store = session_store();
            store.save(&session)?;
            println!("Signed in as {}", session.user.username());
            tracing::info!(path = %store.path().display(), "session saved");
            Ok(())
        }
        Command::Signup {
            username,
            email,
            password,
        } => {
            let password = read_password(password)?;
            match auth_client(&config)?
                .sign_up(&username, &email, &password)
                .await?
            {
                SignUpOutcome::SignedIn(session) => {
                    session_store().save(&session)?;
                    println!("Account created. Signed in as {}", session.user.username());
                }
                SignUpOutcome::ConfirmationRequired { email } => {
                    println!("Check {email} for a confirmation link, then run `leet-tracker login`.");
                }
            }
            Ok(())
        }
        Command::Logout => {
            logout(&config, &session_store()).await?;
            println!("Signed out");
            Ok(())
        }
        Command::Proxy { port } => proxy::serve(&config, port).await,
        Command::Stats => print_stats(&config).await,
        Command::Search { query } => search_problems(&config, &query).await,
        Command::Show { id } => show_problem(&config, &id).await,
        Command::Run { file, language } => run_file(&config, file, language).await,
    }
}

/// Revokes the session server-side when possible; the local file is always removed.
async fn logout(config: &Config, store: &SessionStore) -> Result<()> {
    if let Some(session) = store.load()? {
        match auth_client(config) {
            Ok(auth) => {
                if let Err(e) = auth.sign_out(&session).await {
                    tracing::warn!("Server sign out failed: {}", e);
                }
            }
            Err(e) => tracing::warn!("Skipping server sign out: {}", e),
        }
    }
    store.clear()
}

async fn signed_in_backend(config: &Config) -> Result<Backend> {
    let session = restore_session(&auth_client(config)?, &session_store()).await?;
    let (url, anon_key) = config.supabase()?;
    Backend::new(url, anon_key, &session)
}

async fn print_stats(config: &Config) -> Result<()> {
    let problems = ProblemService::new(signed_in_backend(config).await?)
        .list()
        .await?;
    let stats = calculate_stats(&problems);

    println!("Problems:    {}", stats.total);
    println!(
        "Completed:   {} ({:.1}%)",
        stats.completed,
        stats.completion_rate()
    );
    println!("In progress: {}", stats.in_progress);
    println!("Not started: {}", stats.not_started);
    println!("Failed:      {}", stats.failed);
    println!();
    for difficulty in Difficulty::ALL {
        let bucket = stats.difficulty(difficulty);
        println!(
            "{:<8} {}/{} ({:.0}%)",
            difficulty.label(),
            bucket.completed,
            bucket.total,
            bucket.percent()
        );
    }
    if !stats.categories.is_empty() {
        println!();
        for (category, bucket) in &stats.categories {
            println!("{category}: {}/{}", bucket.completed, bucket.total);
        }
    }
    Ok(())
}

async fn search_problems(config: &Config, query: &str) -> Result<()> {
    let problems = ProblemService::new(signed_in_backend(config).await?)
        .search(query)
        .await?;
    if problems.is_empty() {
        println!("No problems match \"{query}\"");
    }
    for p in problems {
        let star = if p.is_starred { "*" } else { " " };
        println!(
            "{star} {:<36} {:<7} {:<12} {} ({})",
            p.id,
            p.difficulty.label(),
            p.status.label(),
            p.title,
            p.category
        );
    }
    Ok(())
}

async fn show_problem(config: &Config, id: &str) -> Result<()> {
    let backend = signed_in_backend(config).await?;
    let problem = ProblemService::new(backend.clone())
        .get(id)
        .await?
        .ok_or_else(|| AppError::Backend(format!("Problem {id} not found")))?;

    println!("{}", problem.title);
    println!(
        "{} | {} | {} | attempts: {}",
        problem.difficulty, problem.category, problem.status, problem.attempts
    );
    if !problem.url.is_empty() {
        println!("{}", problem.url);
    }
    if !problem.tags.is_empty() {
        println!("tags: {}", problem.tags.join(", "));
    }
    if !problem.notes.is_empty() {
        println!("\n{}", problem.notes);
    }

    let analyses = AnalysisService::new(backend).list(id).await?;
    for analysis in analyses {
        println!("\n--- AI analysis {} ---", analysis.created_at.format("%Y-%m-%d %H:%M"));
        println!("{}", analysis.analysis);
    }
    Ok(())
}

async fn run_file(config: &Config, file: PathBuf, language: Option<String>) -> Result<()> {
    let language = match language {
        Some(name) => Language::from_str(&name).map_err(AppError::Config)?,
        None => file
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(Language::from_extension)
            .ok_or_else(|| {
                AppError::Config(format!(
                    "Cannot tell the language of {}; pass --language",
                    file.display()
                ))
            })?,
    };
    let source = std::fs::read_to_string(&file)?;

    let judge = JudgeClient::new(
        &config.judge_api_url,
        config.judge_api_key.clone(),
        config.judge_max_polls,
        Duration::from_millis(config.judge_poll_interval_ms),
    )?;
    let result = judge.execute(language, &source, None).await;

    if result.mocked {
        eprintln!("(mock execution: no judge API key configured or judge unavailable)");
    }
    print!("{}", result.output);
    if let Some(err) = &result.error {
        eprintln!("{err}");
    }
    if let Some(ms) = result.execution_time {
        eprintln!("time: {ms:.0} ms");
    }
    if let Some(kb) = result.memory_usage {
        eprintln!("memory: {kb} KB");
    }

    if result.success {
        Ok(())
    } else {
        Err(AppError::Judge("Execution failed".to_string()))
    }
}

async fn run_tui(config: &Config) -> Result<()> {
    let session = restore_session(&auth_client(config)?, &session_store()).await?;
    let mut app = App::new(config, &session).await?;

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run the app
    let result = run_app(&mut terminal, &mut app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(e) = result {
        eprintln!("Error: {}", e);
    }

    Ok(())
}

async fn run_app<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    loop {
        terminal.draw(|frame| draw(frame, app))?;

        // Advance spinner and expire notifications
        app.tick();

        // Apply finished background work
        app.poll_task_results().await?;

        // Poll for events with timeout to allow async operations
        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    if let Some(action) = handle_key_event(key, &app.mode, app.view) {
                        let should_quit = app.handle_action(action).await?;
                        if should_quit {
                            return Ok(());
                        }
                    }
                }
            }
        }
    }
}
