use crate::config::{Config, FeedSource};
use crate::feed::{EventFeed, MockSdkFeed};
use crate::hook::EventsHook;
use crate::normalize::to_record;
use crate::render::render_event;
use crate::screen::ThreatEventsScreen;
use crate::service::ThreatEventsService;
use crate::types::ProxyEventDetails;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Everything one console session needs, built once from the config.
pub struct App {
  pub service: Arc<ThreatEventsService>,
  pub mock_sdk: Option<Arc<MockSdkFeed>>,
  pub hook: EventsHook,
}

impl App {
  pub fn build(cfg: &Config, fail_fetches: bool) -> Self {
    let service = Arc::new(ThreatEventsService::new());
    let mock_sdk = (cfg.feed.source == FeedSource::MockSdk)
      .then(|| Arc::new(MockSdkFeed::new(cfg.feed.latency())));
    let feed: Arc<dyn EventFeed> = match &mock_sdk {
      Some(mock) => mock.clone(),
      None => service.clone(),
    };

    if fail_fetches {
      match &mock_sdk {
        Some(mock) => mock.set_fail_fetches(true),
        None => eprintln!("`--fail` only applies to `feed.source = \"mock_sdk\"`; ignoring."),
      }
    }

    tracing::info!(source = ?cfg.feed.source, "threat event feed selected");
    Self {
      service,
      mock_sdk,
      hook: EventsHook::new(feed),
    }
  }
}

pub async fn run_console_command(cfg: &Config, args: &[String]) -> anyhow::Result<()> {
  if args.iter().any(|a| a == "--help" || a == "-h") {
    print_help();
    return Ok(());
  }

  let app = App::build(cfg, args.iter().any(|a| a == "--fail"));

  if let Some(i) = args.iter().position(|a| a == "--simulate") {
    let details = parse_simulate_args(&args[i + 1..])?;
    let event = app.service.simulate_network_proxy_configured_event(details);
    println!("Simulated event {}:", event.id);
    print!("{}", render_event(&event));
    println!();
    if let Some(notice) = simulate_notice(&app) {
      eprintln!("{notice}");
    }
  }

  if args.iter().any(|a| a == "--watch") {
    let demo = args.iter().any(|a| a == "--demo");
    return run_watch(cfg, &app, demo).await;
  }

  let json = args.iter().any(|a| a == "--json");
  print!("{}", list_output(&app, json).await?);
  Ok(())
}

pub async fn list_output(app: &App, json: bool) -> anyhow::Result<String> {
  app.hook.mount().await?;
  let state = app.hook.snapshot();

  if json {
    let records: Vec<_> = state.events.iter().map(to_record).collect();
    return Ok(format!("{}\n", serde_json::to_string_pretty(&records)?));
  }

  let screen = ThreatEventsScreen::new(None);
  Ok(screen.view(&state).to_string())
}

async fn run_watch(cfg: &Config, app: &App, demo: bool) -> anyhow::Result<()> {
  let (stop_tx, mut stop_rx) = mpsc::unbounded_channel::<()>();
  ctrlc::set_handler(move || {
    let _ = stop_tx.send(());
  })?;

  let mut screen = ThreatEventsScreen::new(Some(Box::new(|| {
    println!("Closing threat events.");
  })));

  let live = cfg.feed.live_updates.then(|| app.hook.subscribe_live());
  let mut changes = app.hook.watch();
  let _ = app.hook.mount();

  let mut ticker = tokio::time::interval(cfg.display.watch_interval());
  ticker.tick().await;
  let mut demo_round = 0usize;

  tracing::info!(
    interval_ms = cfg.display.watch_interval_ms,
    live_updates = cfg.feed.live_updates,
    demo,
    "watching threat events"
  );

  loop {
    tokio::select! {
      _ = stop_rx.recv() => break,
      _ = ticker.tick() => {
        if demo {
          demo_round += 1;
          let event = app.service.simulate_network_proxy_configured_event(demo_details(demo_round));
          if let Some(mock) = &app.mock_sdk {
            mock.emit(event);
          }
        }
        let _ = app.hook.refresh();
      }
      changed = changes.changed() => {
        if changed.is_err() {
          break;
        }
        let state = changes.borrow_and_update().clone();
        print!("{}", screen.view(&state));
        println!();
      }
    }
  }

  if let Some(task) = live {
    task.abort();
  }
  screen.dismiss();
  Ok(())
}

/// Simulated events go to the service; the mock SDK list never shows them.
fn simulate_notice(app: &App) -> Option<&'static str> {
  app.mock_sdk.as_ref().map(|_| {
    "`--simulate` appends to the built-in service; `feed.source = \"mock_sdk\"` will not list it."
  })
}

/// `<host> <port> [type] [connection] [state]`; `-` leaves a field empty.
pub fn parse_simulate_args(tail: &[String]) -> anyhow::Result<ProxyEventDetails> {
  let positional: Vec<&str> = tail
    .iter()
    .map(|s| s.as_str())
    .take_while(|s| !s.starts_with("--"))
    .collect();
  if positional.len() < 2 {
    anyhow::bail!("expected: --simulate <host> <port> [type] [connection] [state]");
  }

  let field = |i: usize| {
    positional
      .get(i)
      .filter(|s| **s != "-")
      .map(|s| s.to_string())
  };

  let proxy_port = match field(1) {
    Some(p) => Some(
      p.parse::<i64>()
        .map_err(|_| anyhow::anyhow!("invalid proxy port: {p}"))?,
    ),
    None => None,
  };

  Ok(ProxyEventDetails {
    proxy_host: field(0),
    proxy_port,
    proxy_type: field(2),
    connection_type: field(3),
    application_state: field(4),
  })
}

fn demo_details(round: usize) -> ProxyEventDetails {
  const HOSTS: &[&str] = &["mitm.local", "10.0.0.8", "corp-gw.example.com"];
  const KINDS: &[&str] = &["HTTP", "SOCKS5", "HTTPS"];
  const CONNECTIONS: &[&str] = &["WiFi", "Cellular", "Ethernet"];

  ProxyEventDetails {
    proxy_host: Some(HOSTS[round % HOSTS.len()].to_string()),
    proxy_port: Some(8000 + round as i64),
    proxy_type: Some(KINDS[round % KINDS.len()].to_string()),
    connection_type: Some(CONNECTIONS[round % CONNECTIONS.len()].to_string()),
    application_state: Some(if round % 2 == 0 { "foreground" } else { "background" }.to_string()),
  }
}

fn print_help() {
  println!(
    "threat-events

Usage:
  threat-events [--list] [--json] [--fail]
  threat-events --simulate <host> <port> [type] [connection] [state]
  threat-events --watch [--demo]
  threat-events --version

Options:
  --list       Fetch and print the threat events screen (default)
  --json       Print the fetched events as JSON records
  --simulate   Append a NetworkProxyConfigured event before listing; `-` leaves a field empty
  --watch      Refresh every display.watch_interval_ms until Ctrl+C
  --demo       With --watch, simulate a new proxy event on every refresh
  --fail       Make the mock SDK feed fail its fetches
  --verbose    Also write logs to stderr

Config: $THREAT_EVENTS_HOME/config.toml (default ~/.threat-events/config.toml)"
  );
}
