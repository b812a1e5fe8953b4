//! Inventrack scan station
//!
//! Terminal front end: restores or creates a session, mounts the session
//! watchdog and turns every input line into a manual scan. Lines starting
//! with `:` are commands (`:save`, `:renew`, `:logout`, `:quit`).

use anyhow::Result;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::Notify;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use inventrack::{
    api::{ApiClient, MutationOutcome},
    config::Config,
    models::{ActivityKind, Language, LogoutReason, NewItem, ParsedEquipment, ScanEvent, ViewScope},
    services::{
        messages, BellChime, Clock, Notification, Notifier, ScanIngestor, ScanSink,
        SessionHost, SessionMonitor, SystemClock, TracingNotifier,
    },
    store::{create_store, ClientState},
};

/// Prints decoded scans and remembers the last one for `:save`
#[derive(Default)]
struct StationSink {
    last: Mutex<Option<ParsedEquipment>>,
}

impl ScanSink for StationSink {
    fn accept(&self, parsed: ParsedEquipment, _event: &ScanEvent) {
        match serde_json::to_string_pretty(&parsed) {
            Ok(json) => println!("{json}"),
            Err(e) => tracing::warn!(error = %e, "Failed to render scan"),
        }
        *self.last.lock().unwrap_or_else(|e| e.into_inner()) = Some(parsed);
    }
}

struct StationHost {
    language: Language,
    notifier: Arc<dyn Notifier>,
    ended: Notify,
}

impl SessionHost for StationHost {
    fn show_expiry_warning(&self, remaining: Duration) {
        let minutes = (remaining.as_secs() / 60) as i64;
        let text = messages::expiry_warning(minutes, self.language);
        self.notifier
            .notify(Notification::warning(format!("{text} (:renew)")).sticky());
    }

    fn clear_expiry_warning(&self) {
        tracing::debug!("Renewal prompt cleared");
    }

    fn logged_out(&self, reason: LogoutReason) {
        self.notifier.notify(Notification::info(messages::logout_message(
            reason,
            self.language,
        )));
        self.ended.notify_one();
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "inventrack=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::info!("Starting Inventrack scan station...");

    // Load configuration
    let config = Config::load_with_env(Path::new("config.yml"))?;
    tracing::info!(api = %config.api.base_url, "Configuration loaded");

    let store = create_store(&config.store)?;
    let state = ClientState::new(store);
    let api = Arc::new(ApiClient::new(&config.api, state.clone())?);

    if !state.has_session() {
        let username = std::env::var("INVENTRACK_USERNAME").ok();
        let password = std::env::var("INVENTRACK_PASSWORD").ok();
        let (Some(username), Some(password)) = (username, password) else {
            anyhow::bail!(
                "No saved session. Set INVENTRACK_USERNAME and INVENTRACK_PASSWORD to log in."
            );
        };
        api.login(&username, &password).await?;
    }

    let language = state.language();
    if let Some(user) = state.user() {
        tracing::info!(
            user = %user.profile.display_name(),
            dashboard = ?user.profile.dashboard(),
            "Session restored"
        );
    }

    let notifier: Arc<dyn Notifier> = Arc::new(TracingNotifier);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let host = Arc::new(StationHost {
        language,
        notifier: Arc::clone(&notifier),
        ended: Notify::new(),
    });
    let monitor = SessionMonitor::new(
        config.session.clone(),
        state.clone(),
        Arc::clone(&clock),
        host.clone(),
        Arc::clone(&notifier),
    );
    let handle = monitor.mount(ViewScope::Authenticated);

    let sink = Arc::new(StationSink::default());
    let mut ingestor = ScanIngestor::new(sink.clone(), Arc::clone(&notifier));
    if config.scanner.chime {
        ingestor = ingestor.with_chime(Arc::new(BellChime));
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                handle.record_activity(ActivityKind::Keyboard);

                match line.trim() {
                    "" => {}
                    ":quit" => break,
                    ":logout" => {
                        monitor.logout();
                    }
                    ":renew" => {
                        let monitor = Arc::clone(&monitor);
                        let api = Arc::clone(&api);
                        tokio::spawn(async move {
                            if let Err(e) = monitor.renew(api.as_ref()).await {
                                tracing::warn!(error = %e, "Renewal did not complete");
                            }
                        });
                    }
                    ":save" => {
                        let last = sink.last.lock().unwrap_or_else(|e| e.into_inner()).take();
                        match last {
                            Some(parsed) => {
                                tokio::spawn(save_item(Arc::clone(&api), Arc::clone(&notifier), parsed));
                            }
                            None => notifier.notify(Notification::info("Nothing scanned yet")),
                        }
                    }
                    raw => {
                        ingestor.ingest(&ScanEvent::manual(raw, clock.now_millis()), language);
                    }
                }
            }
            _ = host.ended.notified() => break,
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted");
                break;
            }
        }
    }

    handle.teardown();
    tracing::info!("Scan station stopped");
    Ok(())
}

async fn save_item(api: Arc<ApiClient>, notifier: Arc<dyn Notifier>, parsed: ParsedEquipment) {
    let item = NewItem::from(parsed);
    match api.create_item(&item).await {
        Ok(MutationOutcome::Success(created)) => notifier.notify(Notification::success(format!(
            "Saved {} (#{})",
            created.name, created.id
        ))),
        Ok(outcome) => {
            let message = outcome.failure_message().unwrap_or("Save failed").to_string();
            notifier.notify(Notification::error(message));
        }
        Err(e) => notifier.notify(Notification::error(e.to_string())),
    }
}
