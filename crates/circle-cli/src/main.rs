//! `circle` — terminal UI for contacts and the events around them.
//!
//! # Usage
//!
//! ```
//! circle --api-url https://example.net/api --api-key KEY --email a@x.com
//! circle --config ~/.config/circle/config.toml
//! ```

mod app;
mod ui;

use std::{
  io,
  path::{Path, PathBuf},
  sync::Mutex,
  time::Duration,
};

use anyhow::{Context, Result, anyhow};
use app::{Action, App};
use chrono::{Local, TimeDelta, Utc};
use circle_client::{
  ApiClient, ApiConfig, Dataset, FirebaseAuth, IdentityProvider, LoadError, Session,
  load, session::DEFAULT_SESSION_MINUTES,
};
use clap::Parser;
use crossterm::{
  event::{self, Event},
  execute,
  terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Refresh the ID token this many seconds before it expires.
const REFRESH_MARGIN_SECS: i64 = 300;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "circle", about = "Terminal UI for your contacts and their events")]
struct Args {
  /// Path to a TOML config file.
  #[arg(short, long, value_name = "FILE")]
  config: Option<PathBuf>,

  /// Base URL of the contacts/events API.
  #[arg(long, env = "CIRCLE_API_URL")]
  api_url: Option<String>,

  /// Web API key for the identity provider.
  #[arg(long, env = "CIRCLE_API_KEY")]
  api_key: Option<String>,

  /// Account email.
  #[arg(long, env = "CIRCLE_EMAIL")]
  email: Option<String>,

  /// Account password (prompted for when absent).
  #[arg(long, env = "CIRCLE_PASSWORD")]
  password: Option<String>,

  /// Create the account instead of signing in.
  #[arg(long)]
  sign_up: bool,

  /// Minutes after sign-in before the session ends.
  #[arg(long)]
  session_minutes: Option<i64>,

  /// Write logs here; the terminal itself belongs to the UI.
  #[arg(long, value_name = "FILE")]
  log_file: Option<PathBuf>,
}

// ─── Config file ──────────────────────────────────────────────────────────────

/// Shape of the optional TOML config file.
#[derive(Deserialize, Default)]
struct ConfigFile {
  api_url:         Option<String>,
  api_key:         Option<String>,
  email:           Option<String>,
  password:        Option<String>,
  session_minutes: Option<i64>,
  log_file:        Option<PathBuf>,
}

/// Resolved settings: flags override the config file, which overrides
/// defaults.
struct Settings {
  api_url:         String,
  api_key:         String,
  email:           String,
  password:        Option<String>,
  sign_up:         bool,
  session_minutes: i64,
  log_file:        Option<PathBuf>,
}

impl Settings {
  fn resolve(args: Args) -> Result<Self> {
    let file: ConfigFile = if let Some(path) = &args.config {
      let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading config file {}", path.display()))?;
      toml::from_str(&raw).context("parsing config file")?
    } else {
      ConfigFile::default()
    };

    Ok(Self {
      api_url:         args
        .api_url
        .or(file.api_url)
        .ok_or_else(|| anyhow!("no API URL: pass --api-url or set api_url"))?,
      api_key:         args
        .api_key
        .or(file.api_key)
        .ok_or_else(|| anyhow!("no API key: pass --api-key or set api_key"))?,
      email:           args
        .email
        .or(file.email)
        .ok_or_else(|| anyhow!("no account email: pass --email or set email"))?,
      password:        args.password.or(file.password),
      sign_up:         args.sign_up,
      session_minutes: args
        .session_minutes
        .or(file.session_minutes)
        .unwrap_or(DEFAULT_SESSION_MINUTES),
      log_file:        args.log_file.or(file.log_file).map(|p| expand_tilde(&p)),
    })
  }
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  let settings = Settings::resolve(Args::parse())?;

  if let Some(path) = &settings.log_file {
    init_tracing(path)?;
  }

  let password = match &settings.password {
    Some(p) => p.clone(),
    None => read_password()?,
  };

  let auth = FirebaseAuth::new(&settings.api_key).context("building identity client")?;
  let user = if settings.sign_up {
    auth.sign_up(&settings.email, &password).await
  } else {
    auth.sign_in(&settings.email, &password).await
  }
  .context("signing in")?;

  let client = ApiClient::new(ApiConfig::new(&settings.api_url)).context("building API client")?;
  let session = Session::new(TimeDelta::minutes(settings.session_minutes));
  session.sign_in(user);
  spawn_refresher(auth, session.clone());

  let mut app = App::new(Local::now().date_naive(), settings.email.clone());

  // Set up the terminal.
  enable_raw_mode().context("enabling raw mode")?;
  let mut stdout = io::stdout();
  execute!(stdout, EnterAlternateScreen).context("entering alternate screen")?;
  let backend = CrosstermBackend::new(stdout);
  let mut terminal = Terminal::new(backend).context("creating terminal")?;

  let run_result = run_event_loop(&mut terminal, &mut app, &client, &session).await;

  // Restore terminal regardless of result.
  disable_raw_mode().ok();
  execute!(terminal.backend_mut(), LeaveAlternateScreen).ok();
  terminal.show_cursor().ok();

  if run_result.is_ok() && session.current_user().is_none() {
    println!("Signed out.");
  }
  run_result
}

fn init_tracing(path: &Path) -> Result<()> {
  let file = std::fs::OpenOptions::new()
    .create(true)
    .append(true)
    .open(path)
    .with_context(|| format!("opening log file {}", path.display()))?;

  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .with_ansi(false)
    .with_writer(Mutex::new(file))
    .init();
  Ok(())
}

// ─── Background work ──────────────────────────────────────────────────────────

type LoadOutcome = Result<Dataset, LoadError>;

/// Load both collections for the current user; the result arrives on `tx`.
fn spawn_load(client: &ApiClient, session: &Session, tx: &mpsc::UnboundedSender<LoadOutcome>) {
  let Some(user) = session.current_user() else {
    return;
  };
  let client = client.clone();
  let token = session.token();
  let tx = tx.clone();
  tokio::spawn(async move {
    tx.send(load(&client, &user, &token).await).ok();
  });
}

/// Keep the ID token fresh until the session ends.
fn spawn_refresher(auth: FirebaseAuth, session: Session) {
  tokio::spawn(async move {
    loop {
      let Some(user) = session.current_user() else {
        return;
      };
      let token = session.token();
      let due = user.token_expires_at - TimeDelta::seconds(REFRESH_MARGIN_SECS);
      let wait = (due - Utc::now()).to_std().unwrap_or(Duration::ZERO);

      tokio::select! {
        () = token.cancelled() => return,
        () = tokio::time::sleep(wait) => {}
      }

      match auth.refresh(&user).await {
        Ok(fresh) if !token.is_cancelled() => session.token_refreshed(fresh),
        Ok(_) => return,
        Err(e) => {
          // The session expiry still applies; requests fail with 401 until then.
          tracing::warn!(error = %e, "token refresh failed");
          return;
        }
      }
    }
  });
}

// ─── Event loop ───────────────────────────────────────────────────────────────

async fn run_event_loop(
  terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
  app: &mut App,
  client: &ApiClient,
  session: &Session,
) -> Result<()> {
  let (tx, mut rx) = mpsc::unbounded_channel();
  let mut user_rx = session.subscribe();

  app.start_loading();
  spawn_load(client, session, &tx);

  loop {
    while let Ok(outcome) = rx.try_recv() {
      app.finish_loading(outcome);
    }
    if user_rx.has_changed().unwrap_or(true) && user_rx.borrow_and_update().is_none() {
      break;
    }

    app.today = Local::now().date_naive();
    terminal.draw(|f| ui::draw(f, app)).context("drawing frame")?;

    // Poll for an event, yielding control to tokio while waiting.
    let maybe_event = tokio::task::block_in_place(|| {
      if event::poll(Duration::from_millis(50))? {
        Ok::<_, io::Error>(Some(event::read()?))
      } else {
        Ok(None)
      }
    })?;

    if let Some(Event::Key(key)) = maybe_event {
      match app.handle_key(key) {
        Action::Continue => {}
        Action::Quit => break,
        Action::Reload => {
          app.start_loading();
          spawn_load(client, session, &tx);
        }
        Action::SignOut => {
          session.sign_out();
          break;
        }
      }
    }
  }

  Ok(())
}

// ─── Helpers ──────────────────────────────────────────────────────────────────

/// Prompt for the password without echoing it.
fn read_password() -> Result<String> {
  rpassword::prompt_password("Password: ").context("reading password")
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
