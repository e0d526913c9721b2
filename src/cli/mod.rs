//!
//! facepay operator CLI
//! --------------------
//! Small tool for operating the dashboard core outside a browser: watch the realtime
//! channel, inspect or clear the stored session, replay a facial login and check what the
//! route guard would decide for a path.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use tracing::info;

use crate::config::Config;
use crate::directory::HttpEmployeeDirectory;
use crate::identity::{
    resolve_current_user, FacialLogin, FacialSessionValidator, GuardState, LoginParams, RouteGuard, SessionStore,
    StoredProvider, SystemClock,
};
use crate::realtime::{refresh_on, ConnectionManager, EventFilter};
use crate::storage::{FileStore, SharedKv};

pub fn usage(program: &str) -> String {
    format!(
        "Usage:\n  {program} watch [--ws <url>] [--refresh attendance|employee|payroll|all]\n  {program} session [--storage <path>]\n  {program} login --query \"token=<t>&employee_id=<id>\" [--api <url>] [--storage <path>]\n  {program} logout [--storage <path>]\n  {program} guard <path> [--storage <path>]\n\nEnvironment:\n  FACEPAY_WS_URL, FACEPAY_API_URL, FACEPAY_STORAGE_PATH, FACEPAY_SESSION_TTL_HOURS,\n  FACEPAY_RECONNECT_DELAY_MS, FACEPAY_RECONNECT_ATTEMPTS, RUST_LOG"
    )
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Watch { refresh: Option<EventFilter> },
    Session,
    Login { query: String },
    Logout,
    Guard { path: String },
    Help,
}

/// Parse arguments (without the program name). Flags override `cfg` in place.
pub fn parse_args(args: &[String], cfg: &mut Config) -> Result<Command> {
    let Some(sub) = args.first() else { return Ok(Command::Help) };
    let mut refresh: Option<EventFilter> = None;
    let mut query: Option<String> = None;
    let mut positional: Vec<String> = Vec::new();
    let mut i = 1;
    while i < args.len() {
        let value = |name: &str| -> Result<String> {
            args.get(i + 1).cloned().ok_or_else(|| anyhow!("{} requires a value", name))
        };
        match args[i].as_str() {
            "--ws" => { cfg.ws_url = value("--ws")?; i += 2; }
            "--api" => { cfg.api_url = value("--api")?.trim_end_matches('/').to_string(); i += 2; }
            "--storage" => { cfg.storage_path = PathBuf::from(value("--storage")?); i += 2; }
            "--query" | "-q" => { query = Some(value("--query")?); i += 2; }
            "--refresh" => {
                let v = value("--refresh")?;
                refresh = Some(match v.as_str() {
                    "attendance" => EventFilter::Attendance,
                    "employee" => EventFilter::Employee,
                    "payroll" => EventFilter::Payroll,
                    "all" => EventFilter::AnyDomain,
                    other => return Err(anyhow!("unknown --refresh filter '{}'", other)),
                });
                i += 2;
            }
            "-h" | "--help" => return Ok(Command::Help),
            other if other.starts_with('-') => return Err(anyhow!("unknown flag '{}'", other)),
            other => { positional.push(other.to_string()); i += 1; }
        }
    }
    match sub.as_str() {
        "watch" => Ok(Command::Watch { refresh }),
        "session" => Ok(Command::Session),
        "logout" => Ok(Command::Logout),
        "login" => query.map(|q| Command::Login { query: q }).ok_or_else(|| anyhow!("login requires --query")),
        "guard" => positional
            .into_iter()
            .next()
            .map(|p| Command::Guard { path: p })
            .ok_or_else(|| anyhow!("guard requires a path")),
        "help" | "-h" | "--help" => Ok(Command::Help),
        other => Err(anyhow!("unknown command '{}'", other)),
    }
}

fn validator_for(cfg: &Config, storage: &SharedKv) -> FacialSessionValidator {
    FacialSessionValidator::new(SessionStore::new(storage.clone())).with_ttl(cfg.session_ttl())
}

/// Stdout router: prints where the dashboard would navigate.
struct PrintNavigator;

impl crate::identity::Navigator for PrintNavigator {
    fn navigate(&self, redirect: &crate::identity::Redirect) {
        println!("redirect -> {} (replace={})", redirect.to, redirect.replace);
    }
}

pub async fn run(cmd: Command, cfg: Config) -> Result<()> {
    let storage: SharedKv = Arc::new(FileStore::open(&cfg.storage_path));
    match cmd {
        Command::Help => {
            println!("{}", usage("facepay"));
        }
        Command::Session => {
            let validator = validator_for(&cfg, &storage);
            let provider = StoredProvider::new(storage.clone());
            match resolve_current_user(&validator, &provider) {
                Some(user) => println!("{}", serde_json::to_string_pretty(&user)?),
                None => println!("no active session"),
            }
        }
        Command::Logout => {
            validator_for(&cfg, &storage).logout();
            println!("session cleared");
        }
        Command::Guard { path } => {
            let guard = RouteGuard::new(Arc::new(StoredProvider::new(storage.clone())), validator_for(&cfg, &storage));
            let state = guard.evaluate(&path);
            match &state {
                GuardState::Loading => println!("{}: loading", path),
                GuardState::Admitted => println!("{}: admitted", path),
                GuardState::Denied(_) => println!("{}: denied", path),
            }
            state.apply(&PrintNavigator);
        }
        Command::Login { query } => {
            let directory = HttpEmployeeDirectory::new(&cfg.api_url)?;
            let login = FacialLogin::new(directory, SessionStore::new(storage.clone()), Arc::new(SystemClock));
            let outcome = login.authenticate(&LoginParams::from_query(&query)).await;
            println!("{}", outcome.status.text());
            outcome.follow(&PrintNavigator).await;
            if !outcome.is_success() {
                return Err(anyhow!("facial login failed"));
            }
        }
        Command::Watch { refresh } => {
            let mut manager = ConnectionManager::new(&cfg);
            let mut trigger = refresh.map(|f| {
                refresh_on(f, || info!(target: "facepay::page", "refresh requested"))
            });
            let handle = manager
                .connect(move |event| {
                    println!("{}", serde_json::to_string(&event).unwrap_or_else(|_| event.kind.to_string()));
                    if let Some(t) = trigger.as_mut() { t.handle(&event); }
                })
                .await;
            if handle.is_noop() {
                return Err(anyhow!("realtime transport unavailable for {}", cfg.ws_url));
            }
            info!(target: "facepay::realtime", "watching {} (Ctrl-C to stop)", cfg.ws_url);
            tokio::signal::ctrl_c().await?;
            handle.disconnect().await;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(v: &[&str]) -> Vec<String> { v.iter().map(|s| s.to_string()).collect() }

    #[test]
    fn parses_watch_with_overrides() {
        let mut cfg = Config::default();
        let cmd = parse_args(&args(&["watch", "--ws", "ws://rt:9000", "--refresh", "attendance"]), &mut cfg).unwrap();
        assert_eq!(cmd, Command::Watch { refresh: Some(EventFilter::Attendance) });
        assert_eq!(cfg.ws_url, "ws://rt:9000");
    }

    #[test]
    fn parses_guard_and_login() {
        let mut cfg = Config::default();
        assert_eq!(
            parse_args(&args(&["guard", "/payroll", "--storage", "/tmp/s.json"]), &mut cfg).unwrap(),
            Command::Guard { path: "/payroll".into() }
        );
        assert_eq!(cfg.storage_path, PathBuf::from("/tmp/s.json"));
        assert_eq!(
            parse_args(&args(&["login", "-q", "token=t&employee_id=1"]), &mut cfg).unwrap(),
            Command::Login { query: "token=t&employee_id=1".into() }
        );
    }

    #[test]
    fn rejects_bad_input() {
        let mut cfg = Config::default();
        assert!(parse_args(&args(&["login"]), &mut cfg).is_err());
        assert!(parse_args(&args(&["watch", "--refresh", "salaries"]), &mut cfg).is_err());
        assert!(parse_args(&args(&["watch", "--ws"]), &mut cfg).is_err());
        assert!(parse_args(&args(&["frobnicate"]), &mut cfg).is_err());
        assert_eq!(parse_args(&[], &mut cfg).unwrap(), Command::Help);
    }
}
