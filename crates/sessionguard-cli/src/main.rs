//! SessionGuard CLI - inspect and drive the dashboard session from a terminal.
//!
//! Every command builds the session store from the user's config, restores
//! any persisted token, and then acts on it.

use std::io;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use chrono::{Duration, Utc};
use serde_json::json;
use sessionguard_core::token::encode_unsigned;
use sessionguard_core::{decode, AccessGuard, Config, Rendered, SessionState, SessionStore};
use tracing::{debug, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Environment variable consulted by `login` when no token argument is given
const ENV_TOKEN: &str = "SESSIONGUARD_TOKEN";

const USAGE: &str = "\
Usage: sessionguard <command> [args]

Commands:
  login [TOKEN]                          Start a session (token from arg, $SESSIONGUARD_TOKEN, or prompt)
  logout                                 End the current session
  whoami                                 Show the current user
  check [--all] ROLE...                  Exit 0 if the current user may see content guarded by ROLEs
  decode TOKEN                           Print the claims carried by TOKEN
  mint SUB [ROLE...] [--exp SECONDS]     Build an unsigned token for local testing";

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

/// Outcome of a command, mapped onto the process exit code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Success,
    Failure,
    Usage,
}

impl From<Status> for ExitCode {
    fn from(status: Status) -> Self {
        match status {
            Status::Success => ExitCode::SUCCESS,
            Status::Failure => ExitCode::FAILURE,
            Status::Usage => ExitCode::from(2),
        }
    }
}

fn main() -> ExitCode {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();
    init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let load_config = || Config::load().context("Failed to load config");
    match run(&args, load_config) {
        Ok(status) => status.into(),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            Status::Usage.into()
        }
    }
}

/// Dispatch a command. `config` is only consulted by commands that touch the session.
fn run(args: &[String], config: impl FnOnce() -> Result<Config>) -> Result<Status> {
    let Some((command, rest)) = args.split_first() else {
        eprintln!("{}", USAGE);
        return Ok(Status::Usage);
    };

    match command.as_str() {
        "login" => login(rest, &config()?),
        "logout" => logout(&config()?),
        "whoami" => whoami(&config()?),
        "check" => check(rest, &config()?),
        "decode" => decode_token(rest),
        "mint" => mint(rest),
        "-h" | "--help" | "help" => {
            println!("{}", USAGE);
            Ok(Status::Success)
        }
        other => bail!("unknown command '{}'\n\n{}", other, USAGE),
    }
}

/// Session store from config, with any persisted token restored
fn open_session(config: &Config) -> Result<SessionStore> {
    debug!(storage = ?config.storage, "Opening session");
    let mut session = config
        .open_session()
        .context("Failed to open token storage")?;
    session.restore();
    Ok(session)
}

fn login(args: &[String], config: &Config) -> Result<Status> {
    let token = match args.first() {
        Some(token) => token.clone(),
        None => match std::env::var(ENV_TOKEN) {
            Ok(token) if !token.trim().is_empty() => token,
            _ => rpassword::prompt_password("Token: ").context("Failed to read token")?,
        },
    };

    let mut session = open_session(config)?;
    match session.login(&token) {
        SessionState::Authenticated => {
            print_user(&session)?;
            Ok(Status::Success)
        }
        _ => {
            match session.last_rejection() {
                Some(reason) => eprintln!("login rejected: {}", reason),
                None => eprintln!("login rejected"),
            }
            Ok(Status::Failure)
        }
    }
}

fn logout(config: &Config) -> Result<Status> {
    let mut session = open_session(config)?;
    session.logout();
    info!("Session cleared");
    println!("logged out");
    Ok(Status::Success)
}

/// Succeeds only when a session is active.
fn whoami(config: &Config) -> Result<Status> {
    let session = open_session(config)?;
    if session.is_authenticated() {
        print_user(&session)?;
        return Ok(Status::Success);
    }

    println!("anonymous");
    if let Some(reason) = session.last_rejection() {
        eprintln!("persisted token discarded: {}", reason);
    }
    Ok(Status::Failure)
}

fn check(args: &[String], config: &Config) -> Result<Status> {
    let mut require_all = false;
    let mut roles = Vec::new();
    for arg in args {
        match arg.as_str() {
            "--all" => require_all = true,
            flag if flag.starts_with("--") => bail!("unknown flag '{}'", flag),
            role => roles.push(role.to_string()),
        }
    }

    let mut guard = AccessGuard::new("granted").require(roles).fallback("denied");
    if require_all {
        guard = guard.require_all();
    }

    let session = open_session(config)?;
    match guard.render(&session) {
        Rendered::Protected(label) => {
            println!("{}", label);
            Ok(Status::Success)
        }
        Rendered::Fallback(label) => {
            println!("{}", label);
            Ok(Status::Failure)
        }
        Rendered::Nothing => Ok(Status::Failure),
    }
}

fn decode_token(args: &[String]) -> Result<Status> {
    let Some(token) = args.first() else {
        bail!("decode needs a TOKEN argument");
    };
    match decode(token) {
        Ok(claims) => {
            println!("{}", serde_json::to_string_pretty(&claims)?);
            Ok(Status::Success)
        }
        Err(e) => {
            eprintln!("{}", e);
            Ok(Status::Failure)
        }
    }
}

/// Build the claims for `mint` without printing them.
fn mint_claims(args: &[String]) -> Result<serde_json::Value> {
    let Some((subject, rest)) = args.split_first() else {
        bail!("mint needs a SUB argument");
    };

    let now = Utc::now();
    let mut roles = Vec::new();
    let mut exp = None;
    let mut iter = rest.iter();
    while let Some(arg) = iter.next() {
        if arg == "--exp" {
            let seconds: i64 = iter
                .next()
                .context("--exp needs a value")?
                .parse()
                .context("--exp must be a number of seconds")?;
            let expires = Duration::try_seconds(seconds)
                .and_then(|delta| now.checked_add_signed(delta))
                .context("--exp is out of range")?;
            exp = Some(expires.timestamp());
        } else {
            roles.push(arg.clone());
        }
    }

    let mut claims = json!({
        "sub": subject,
        "roles": roles,
        "iat": now.timestamp(),
    });
    if let Some(exp) = exp {
        claims["exp"] = json!(exp);
    }
    Ok(claims)
}

fn mint(args: &[String]) -> Result<Status> {
    println!("{}", encode_unsigned(&mint_claims(args)?));
    Ok(Status::Success)
}

fn print_user(session: &SessionStore) -> Result<()> {
    if let Some(user) = session.current_user() {
        println!("{}", serde_json::to_string_pretty(user)?);
        if let Some(minutes) = user.minutes_until_expiry(Utc::now()) {
            eprintln!("expires in {} minutes", minutes);
        }
    }
    Ok(())
}
