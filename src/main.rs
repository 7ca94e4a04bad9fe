mod activity;
mod api;
mod cli;
mod config;
mod models;
mod query;
mod router;
mod session;
mod token;
mod views;

use anyhow::{bail, Result};
use clap::Parser;
use std::cell::RefCell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "conectar", about = "User administration console for the Conectar API")]
pub struct Args {
    #[arg(short, long, help = "Run one console command and exit")]
    pub command: Option<String>,

    #[arg(long, env = "CONECTAR_API_URL", help = "API base URL (overrides config)")]
    pub base_url: Option<String>,

    #[arg(long, help = "Config file path")]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Session token file (default: ~/.conectar/session)")]
    pub session_file: Option<PathBuf>,

    #[arg(long, default_value = "/", help = "Initial route: /, /register, /dashboard, /profile")]
    pub route: String,

    #[arg(long, help = "Auto-confirm deletions in -c mode")]
    pub yes: bool,

    #[arg(long, help = "Activity log directory")]
    pub log_dir: Option<PathBuf>,

    #[arg(long, help = "Verbose output (navigation and redirects)")]
    pub verbose: bool,

    #[arg(long, help = "Debug output (print HTTP details and settings)")]
    pub debug: bool,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let mut cfg = if let Some(config_path) = &args.config {
        config::Config::load_from(config_path)?
    } else {
        config::Config::load()?
    };

    if let Some(base_url) = &args.base_url {
        cfg.api.base_url = Some(base_url.clone());
    }

    if let Err(errors) = cfg.validate() {
        for error in &errors {
            eprintln!("Config error {}", error);
        }
        bail!("Invalid configuration ({} errors)", errors.len());
    }

    let store = match &args.session_file {
        Some(path) => session::SessionStore::new(path.clone()),
        None => match cfg.session_store() {
            Some(store) => store,
            None => bail!("Cannot locate a home directory; pass --session-file"),
        },
    };
    let session = session::Session::open(store)?;

    let http = api::UreqClient::new(cfg.base_url(), cfg.timeout());

    if args.debug {
        eprintln!("[DEBUG] API base URL: {}", http.base_url());
        eprintln!("[DEBUG] Timeout: {:?}", cfg.timeout());
        eprintln!("[DEBUG] Session file: {}", session.store().path().display());
        eprintln!("[DEBUG] Initial query: {:?}", cfg.initial_query());
    }

    let log_dir = args.log_dir.clone().unwrap_or_else(|| {
        dirs::home_dir()
            .map(|home| home.join(".conectar"))
            .unwrap_or_else(|| PathBuf::from(".conectar"))
            .join("logs")
    });
    std::fs::create_dir_all(&log_dir)?;

    let session_id = uuid::Uuid::new_v4().to_string();
    let log_path = log_dir.join(format!("{}.jsonl", session_id));
    let mut activity = activity::ActivityLog::new(&log_path, &session_id)?;
    activity.start(http.base_url())?;

    let ctx = cli::Context {
        args,
        config: cfg,
        http: Box::new(http),
        session: RefCell::new(session),
        activity: RefCell::new(activity),
        session_id,
    };

    if ctx.args.debug {
        eprintln!(
            "[DEBUG] Session {} logging to {}",
            ctx.session_id,
            ctx.activity.borrow().path.display()
        );
    }

    if let Some(command) = &ctx.args.command {
        cli::run_once(&ctx, command)
    } else {
        cli::run_repl(ctx)
    }
}
