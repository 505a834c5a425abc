use super::bot::Bot;
use crate::channels::local::{is_chat_exit_command, parse_chat_line, render_screen};
use crate::channels::local::{LocalEvent, LocalTransport};
use crate::channels::Inbound;
use crate::channels::telegram::{run_polling, TelegramApiClient};
use crate::config::{default_global_config_path, load_settings, Settings};
use crate::dispatch::catalog::command_help;
use crate::orders::PaymentOutcome;
use crate::shared::{ChatId, EventLog};
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const DEFAULT_LOCAL_CHAT_ID: i64 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliVerb {
    Run,
    Stop,
    CheckConfig,
    PaymentEvent,
    Chat,
    Help,
    Unknown,
}

pub fn parse_cli_verb(input: &str) -> CliVerb {
    match input {
        "run" => CliVerb::Run,
        "stop" => CliVerb::Stop,
        "check-config" => CliVerb::CheckConfig,
        "payment-event" => CliVerb::PaymentEvent,
        "chat" => CliVerb::Chat,
        "help" | "--help" | "-h" => CliVerb::Help,
        _ => CliVerb::Unknown,
    }
}

pub fn help_text() -> String {
    [
        "Usage: haulbot [--config <path>] <command>",
        "",
        "Commands:",
        "  run                          Poll Telegram and serve chats until stopped",
        "  stop                         Ask a running bot to shut down",
        "  check-config                 Validate the settings file",
        "  payment-event <file>         Apply a payment notification stored in <file>",
        "  chat [chat_id]               Talk to the bot from this terminal",
    ]
    .join("\n")
}

/// Splits a leading `--config <path>` off the arguments.
fn split_config_flag(args: Vec<String>) -> Result<(Option<PathBuf>, Vec<String>), String> {
    let mut config = None;
    let mut rest = Vec::new();
    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        if arg == "--config" {
            let path = iter
                .next()
                .ok_or_else(|| "`--config` requires a path".to_string())?;
            config = Some(PathBuf::from(path));
        } else if let Some(path) = arg.strip_prefix("--config=") {
            config = Some(PathBuf::from(path));
        } else {
            rest.push(arg);
        }
    }
    Ok((config, rest))
}

fn load(config: Option<PathBuf>) -> Result<(PathBuf, Settings), String> {
    let path = match config {
        Some(path) => path,
        None => default_global_config_path().map_err(|e| e.to_string())?,
    };
    let settings = load_settings(&path).map_err(|e| e.to_string())?;
    Ok((path, settings))
}

pub fn run_cli(args: Vec<String>) -> Result<String, String> {
    let (config, args) = split_config_flag(args)?;
    let Some(verb) = args.first() else {
        return Ok(help_text());
    };

    match parse_cli_verb(verb) {
        CliVerb::Run => cmd_run(config),
        CliVerb::Stop => cmd_stop(config),
        CliVerb::CheckConfig => cmd_check_config(config),
        CliVerb::PaymentEvent => cmd_payment_event(config, &args[1..]),
        CliVerb::Chat => cmd_chat(config, &args[1..]),
        CliVerb::Help => Ok(help_text()),
        CliVerb::Unknown => Err(format!("unknown command `{verb}`")),
    }
}

fn cmd_check_config(config: Option<PathBuf>) -> Result<String, String> {
    let (path, settings) = load(config)?;
    let token = if settings.telegram.bot_token.trim().is_empty() {
        "missing"
    } else {
        "set"
    };
    let payments = if settings.payments.enabled {
        "enabled"
    } else {
        "disabled"
    };
    Ok(format!(
        "config ok: {}\nstate_root={}\ntimezone={}\nwork_hours={}-{}\ntelegram_token={token}\npayments={payments}",
        path.display(),
        settings.state_root.display(),
        settings.business.timezone,
        settings.business.work_hours.start,
        settings.business.work_hours.end,
    ))
}

fn cmd_stop(config: Option<PathBuf>) -> Result<String, String> {
    let (_, settings) = load(config)?;
    let paths = settings.paths();
    let stop_path = paths.stop_signal_path();
    std::fs::write(&stop_path, b"stop")
        .map_err(|e| format!("failed to write {}: {e}", stop_path.display()))?;
    Ok(format!("stop requested via {}", stop_path.display()))
}

fn cmd_run(config: Option<PathBuf>) -> Result<String, String> {
    let (_, settings) = load(config)?;
    settings
        .require_telegram_token()
        .map_err(|e| e.to_string())?;
    let client = TelegramApiClient::new(&settings.telegram);
    let bot = Bot::from_settings(&settings, Arc::new(client.clone()), Arc::new(client.clone()))
        .map_err(|e| e.to_string())?;

    let paths = settings.paths();
    let stop_path = paths.stop_signal_path();
    if stop_path.exists() {
        std::fs::remove_file(&stop_path)
            .map_err(|e| format!("failed to clear {}: {e}", stop_path.display()))?;
    }
    let log = EventLog::for_state_root(paths.root());
    let stop = AtomicBool::new(false);

    thread::scope(|scope| {
        scope.spawn(|| {
            while !stop.load(Ordering::Relaxed) {
                if stop_path.exists() {
                    log.info("bot.stop_signal", "stop file detected");
                    stop.store(true, Ordering::Relaxed);
                    break;
                }
                thread::sleep(Duration::from_millis(200));
            }
        });
        let handler = |inbound: Inbound| {
            if let Err(err) = bot.handle_inbound(inbound) {
                log.warn("telegram.handle_failed", &err.to_string());
            }
        };
        run_polling(&client, &handler, &stop, &log);
        stop.store(true, Ordering::Relaxed);
    });

    if stop_path.exists() {
        let _ = std::fs::remove_file(&stop_path);
    }
    Ok("bot stopped".to_string())
}

fn cmd_payment_event(config: Option<PathBuf>, args: &[String]) -> Result<String, String> {
    let file = args
        .first()
        .ok_or_else(|| "usage: haulbot payment-event <file>".to_string())?;
    let body =
        std::fs::read_to_string(file).map_err(|e| format!("failed to read {file}: {e}"))?;
    let (_, settings) = load(config)?;
    settings
        .require_telegram_token()
        .map_err(|e| e.to_string())?;
    let client = TelegramApiClient::new(&settings.telegram);
    let bot = Bot::from_settings(&settings, Arc::new(client.clone()), Arc::new(client))
        .map_err(|e| e.to_string())?;

    match bot.handle_payment_webhook(&body).map_err(|e| e.to_string())? {
        Some(PaymentOutcome::Applied(order)) => Ok(format!(
            "order {} is now {}",
            order
                .id
                .map(|id| id.to_string())
                .unwrap_or_else(|| "-".to_string()),
            order.status
        )),
        Some(PaymentOutcome::Ignored { order_id, status }) => Ok(format!(
            "order {order_id} is {status}; payment not applied"
        )),
        None => Ok("event ignored".to_string()),
    }
}

/// Runs the bot against stdin/stdout with the in-process transport.
fn cmd_chat(config: Option<PathBuf>, args: &[String]) -> Result<String, String> {
    let chat = match args.first() {
        Some(raw) => ChatId::parse(raw)?,
        None => ChatId::new(DEFAULT_LOCAL_CHAT_ID),
    };
    let (_, settings) = load(config)?;
    let transport = Arc::new(LocalTransport::new());
    let bot = Bot::from_settings(&settings, transport.clone(), transport.clone())
        .map_err(|e| e.to_string())?;

    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();
    let mut current = None;
    let mut seen = 0;
    writeln!(
        stdout,
        "type /start to begin, /help for commands, `exit` to leave"
    )
    .map_err(|e| e.to_string())?;
    for line in stdin.lock().lines() {
        let line = line.map_err(|e| e.to_string())?;
        if is_chat_exit_command(&line) {
            break;
        }
        if let Some(name) = line.trim().strip_prefix("/help") {
            let name = Some(name.trim()).filter(|n| !n.is_empty());
            let help = command_help(name).unwrap_or_else(|err| format!("! {err}"));
            writeln!(stdout, "{help}").map_err(|e| e.to_string())?;
            continue;
        }
        let inbound = match parse_chat_line(chat, &line, current) {
            Ok(Some(inbound)) => inbound,
            Ok(None) => continue,
            Err(err) => {
                writeln!(stdout, "! {err}").map_err(|e| e.to_string())?;
                continue;
            }
        };
        match bot.handle_inbound(inbound) {
            Ok(message) => current = Some(message),
            Err(err) => writeln!(stdout, "! {err}").map_err(|e| e.to_string())?,
        }

        let events = transport.events();
        for event in events.iter().skip(seen) {
            match event {
                LocalEvent::Notification { chat: to, text } => {
                    writeln!(stdout, "-- notification for {to}: {text}")
                        .map_err(|e| e.to_string())?;
                }
                LocalEvent::Media { chat: to, items, .. } if *to == chat => {
                    writeln!(stdout, "-- {} media item(s)", items.len())
                        .map_err(|e| e.to_string())?;
                }
                _ => {}
            }
        }
        seen = events.len();
        if let Some(screen) = transport.last_screen(chat) {
            writeln!(stdout, "\n{}\n", render_screen(&screen)).map_err(|e| e.to_string())?;
        }
    }
    Ok("bye".to_string())
}
