//! Command-line front end
//!
//! Parses arguments with clap, starts an [`AppContext`] and runs one command
//! against it. Output goes to stdout; errors and the session-expiry notice
//! go to stderr.

pub mod render;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use tokio::sync::broadcast;

use crate::app::{AppContext, StoreKind};
use crate::client::{ApiClient, ApiError, TrackerApi};
use crate::config::Config;
use crate::models::{Credentials, JobCreate, JobStatus, SessionEvent, StatusFilter, UserCreate};

/// Track job applications from the terminal
#[derive(Debug, Parser)]
#[command(name = "jobtrack", version, about)]
pub struct Cli {
    /// Configuration file
    #[arg(long, short, env = "JOBTRACK_CONFIG", default_value = "jobtrack.yml")]
    pub config: PathBuf,

    /// Keep credentials in memory only for this run
    #[arg(long)]
    pub ephemeral: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Sign in and store the session token
    Login {
        #[arg(long, short)]
        email: String,
        #[arg(long, short, env = "JOBTRACK_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Create an account and sign in
    Register {
        #[arg(long, short)]
        email: String,
        #[arg(long, short, env = "JOBTRACK_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
    },
    /// Forget the stored session token
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Check that the backend is reachable
    Health,
    /// Manage job applications
    #[command(subcommand)]
    Jobs(JobsCommand),
    /// Show counters per status
    Stats {
        #[arg(long, short, default_value = "all")]
        status: StatusFilter,
    },
    /// Show or change the dark-mode preference
    Theme {
        #[arg(value_enum, default_value = "show")]
        action: ThemeAction,
    },
}

#[derive(Debug, Subcommand)]
pub enum JobsCommand {
    /// List jobs, optionally for one status
    List {
        #[arg(long, short, default_value = "all")]
        status: StatusFilter,
    },
    /// Record a new application
    Add(JobFields),
    /// Change fields of an application
    Edit {
        id: i64,
        #[command(flatten)]
        fields: JobEdits,
    },
    /// Delete an application
    Delete { id: i64 },
}

#[derive(Debug, Args)]
pub struct JobFields {
    #[arg(long)]
    pub title: String,
    #[arg(long)]
    pub company: String,
    #[arg(long)]
    pub location: Option<String>,
    /// Defaults to Applied
    #[arg(long)]
    pub status: Option<JobStatus>,
    /// YYYY-MM-DD, defaults to today
    #[arg(long)]
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Args)]
pub struct JobEdits {
    #[arg(long)]
    pub title: Option<String>,
    #[arg(long)]
    pub company: Option<String>,
    #[arg(long)]
    pub location: Option<String>,
    #[arg(long)]
    pub status: Option<JobStatus>,
    #[arg(long)]
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ThemeAction {
    Show,
    Toggle,
    Dark,
    Light,
}

impl From<JobFields> for JobCreate {
    fn from(fields: JobFields) -> Self {
        let mut input = JobCreate::new(fields.title, fields.company);
        input.location = fields.location;
        if let Some(status) = fields.status {
            input.status = status;
        }
        if let Some(date) = fields.date {
            input.date_applied = date;
        }
        input
    }
}

impl JobEdits {
    fn apply(self, mut input: JobCreate) -> JobCreate {
        if let Some(title) = self.title {
            input.title = title;
        }
        if let Some(company) = self.company {
            input.company = company;
        }
        if let Some(location) = self.location {
            input.location = Some(location).filter(|l| !l.is_empty());
        }
        if let Some(status) = self.status {
            input.status = status;
        }
        if let Some(date) = self.date {
            input.date_applied = date;
        }
        input
    }
}

/// Run the parsed command line
pub async fn run(cli: Cli) -> Result<ExitCode> {
    let config = Config::load_with_env(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    let kind = if cli.ephemeral {
        StoreKind::Ephemeral
    } else {
        StoreKind::File
    };
    let store = AppContext::open_store(&config.storage, kind)?;

    let app = AppContext::start(config, store).await?;
    let mut events = app.session.events();

    let outcome = execute(&app, cli.command).await;
    let expired = drain_expiry(&mut events);
    app.shutdown();

    match outcome {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(e) if expired || is_session_expiry(&e) => {
            eprintln!("{}", ApiError::Unauthorized);
            Ok(ExitCode::FAILURE)
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            Ok(ExitCode::FAILURE)
        }
    }
}

fn is_session_expiry(err: &anyhow::Error) -> bool {
    err.downcast_ref::<ApiError>()
        .is_some_and(ApiError::is_session_expiry)
}

fn drain_expiry(events: &mut broadcast::Receiver<SessionEvent>) -> bool {
    let mut expired = false;
    while let Ok(event) = events.try_recv() {
        expired |= event == SessionEvent::Expired;
    }
    expired
}

fn require_session(app: &AppContext) -> Result<()> {
    if app.session.is_authenticated() {
        Ok(())
    } else {
        Err(anyhow!("Not logged in. Run `jobtrack login` first."))
    }
}

async fn check_health(api: &ApiClient) -> Result<()> {
    match api.health().await {
        Ok(true) => Ok(()),
        Ok(false) => Err(anyhow!("Backend at {} answered with an error status", api.base_url())),
        Err(e) => Err(e).with_context(|| format!("Backend at {} is not reachable", api.base_url())),
    }
}

async fn execute(app: &AppContext, command: Command) -> Result<()> {
    match command {
        Command::Login { email, password } => {
            let user = app.session.sign_in(&Credentials::new(email, password)).await?;
            println!("Signed in as {}", user.display_name());
        }
        Command::Register {
            email,
            password,
            first_name,
            last_name,
        } => {
            let input = UserCreate::new(email, password, first_name, last_name);
            let user = app.session.sign_up(&input).await?;
            println!("Account created. Signed in as {}", user.display_name());
        }
        Command::Logout => {
            app.session.logout();
            println!("Signed out");
        }
        Command::Whoami => match app.session.current_user() {
            Some(user) => print!("{}", render::user(&user)),
            None => println!("Not logged in"),
        },
        Command::Health => {
            check_health(&app.api).await?;
            println!("Backend at {} is up", app.api.base_url());
        }
        Command::Jobs(command) => {
            require_session(app)?;
            jobs(app, command).await?;
        }
        Command::Stats { status } => {
            require_session(app)?;
            app.board.select(status).await?;
            let view = app.board.view();
            print!("{}", render::stats(view.filter, &view.stats));
        }
        Command::Theme { action } => {
            let dark = match action {
                ThemeAction::Show => app.theme.is_dark(),
                ThemeAction::Toggle => app.theme.toggle()?,
                ThemeAction::Dark => {
                    app.theme.set(true)?;
                    true
                }
                ThemeAction::Light => {
                    app.theme.set(false)?;
                    false
                }
            };
            println!("Theme: {}", if dark { "dark" } else { "light" });
        }
    }
    Ok(())
}

async fn jobs(app: &AppContext, command: JobsCommand) -> Result<()> {
    match command {
        JobsCommand::List { status } => {
            app.board.select(status).await?;
            print!("{}", render::job_table(&app.board.view().jobs));
        }
        JobsCommand::Add(fields) => {
            let job = app.board.create_job(&fields.into()).await?;
            println!("Created {}", render::job_line(&job));
        }
        JobsCommand::Edit { id, fields } => {
            let jobs = app.cache.list_jobs(StatusFilter::All).await?;
            let current = jobs
                .iter()
                .find(|job| job.id == id)
                .ok_or_else(|| ApiError::NotFound(format!("Job {} not found", id)))?;

            let input = fields.apply(current.to_update());
            let job = app.board.update_job(id, &input).await?;
            println!("Updated {}", render::job_line(&job));
        }
        JobsCommand::Delete { id } => {
            app.board.delete_job(id).await?;
            println!("Deleted job #{}", id);
        }
    }
    Ok(())
}
