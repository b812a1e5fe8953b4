//! Session lifecycle watchdog
//!
//! Keeps an authenticated view from silently outliving either the backend's
//! token validity or the configured inactivity ceiling:
//! - a periodic check derives the expiry from the persisted token every time
//! - the renewal prompt is raised once, a little before expiry
//! - expiry, idle timeout, unreadable tokens and failed renewals end in a
//!   forced logout with a distinct [`LogoutReason`]
//!
//! One [`SessionMonitor`] lives for the whole application. Each mount spawns
//! exactly one interval task and hands back a [`MonitorHandle`]; mounting
//! again, or dropping the handle, tears the previous task down first.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::api::ApiError;
use crate::config::SessionConfig;
use crate::models::{ActivityKind, LogoutReason, MonitorState, SessionSnapshot, ViewScope};
use crate::services::clock::Clock;
use crate::services::messages;
use crate::services::notify::{Notification, Notifier};
use crate::services::token;
use crate::store::ClientState;

/// Error types for session operations
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// A renewal request is already outstanding
    #[error("Session renewal already in progress")]
    RenewalInFlight,

    /// The monitor is inactive or the session already ended
    #[error("No monitored session")]
    NotMonitoring,

    /// The renewal failed; the session has been ended
    #[error("Session renewal failed: {0}")]
    Renewal(String),
}

/// Exchanges a still-valid token for a fresh one (`POST /auth/refresh`)
#[async_trait]
pub trait TokenRenewer: Send + Sync {
    async fn renew(&self, token: &str) -> Result<String, ApiError>;
}

/// Callbacks into the host shell
pub trait SessionHost: Send + Sync {
    /// Show the renewal prompt; it must not dismiss itself
    fn show_expiry_warning(&self, remaining: Duration);

    /// Remove the renewal prompt
    fn clear_expiry_warning(&self);

    /// The session is gone and persisted state is cleared; go to the login view
    fn logged_out(&self, reason: LogoutReason);
}

/// What a single check did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckOutcome {
    /// Not monitoring (inactive, torn down or already logged out)
    Skipped,
    /// Nothing to do
    Healthy,
    /// The renewal prompt was raised by this check
    WarningRaised { remaining_ms: i64 },
    /// The token was renewed elsewhere and the prompt was removed
    WarningCleared,
    /// This check ended the session
    LoggedOut(LogoutReason),
}

struct MonitorInner {
    state: MonitorState,
    last_activity_ms: i64,
    warning_shown: bool,
}

/// Session watchdog
pub struct SessionMonitor {
    config: SessionConfig,
    state: ClientState,
    clock: Arc<dyn Clock>,
    host: Arc<dyn SessionHost>,
    notifier: Arc<dyn Notifier>,
    inner: Mutex<MonitorInner>,
    renewing: AtomicBool,
    generation: AtomicU64,
    task: Mutex<Option<JoinHandle<()>>>,
    checks_run: AtomicU64,
}

impl SessionMonitor {
    pub fn new(
        config: SessionConfig,
        state: ClientState,
        clock: Arc<dyn Clock>,
        host: Arc<dyn SessionHost>,
        notifier: Arc<dyn Notifier>,
    ) -> Arc<Self> {
        let now = clock.now_millis();
        Arc::new(Self {
            config,
            state,
            clock,
            host,
            notifier,
            inner: Mutex::new(MonitorInner {
                state: MonitorState::Inactive,
                last_activity_ms: now,
                warning_shown: false,
            }),
            renewing: AtomicBool::new(false),
            generation: AtomicU64::new(0),
            task: Mutex::new(None),
            checks_run: AtomicU64::new(0),
        })
    }

    /// Mount the watchdog for a view.
    ///
    /// Must be called from within a tokio runtime. Any previous mount is torn
    /// down before the new interval task starts. Public views and missing
    /// sessions leave the monitor inactive.
    pub fn mount(self: &Arc<Self>, scope: ViewScope) -> MonitorHandle {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.abort_task();

        let now = self.clock.now_millis();
        let active = scope == ViewScope::Authenticated && self.state.has_session();
        {
            let mut inner = self.lock_inner();
            inner.state = if active {
                MonitorState::Monitoring
            } else {
                MonitorState::Inactive
            };
            inner.last_activity_ms = now;
            inner.warning_shown = false;
        }

        if !active {
            tracing::debug!(?scope, "Session monitor inactive");
            return MonitorHandle {
                monitor: Arc::clone(self),
                generation,
            };
        }

        let monitor = Arc::clone(self);
        let period = self.config.check_interval();
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if !monitor.is_current(generation) {
                    break;
                }
                monitor.check();
                if monitor.state().is_terminal() {
                    break;
                }
            }
        });
        *self.task.lock().unwrap_or_else(|e| e.into_inner()) = Some(task);

        tracing::debug!(generation, interval = ?period, "Session monitor mounted");
        MonitorHandle {
            monitor: Arc::clone(self),
            generation,
        }
    }

    /// Run one check now.
    ///
    /// Idempotent: repeating it immediately never raises the prompt twice or
    /// logs out twice.
    pub fn check(&self) -> CheckOutcome {
        let now = self.clock.now_millis();
        let last_activity_ms = {
            let inner = self.lock_inner();
            match inner.state {
                MonitorState::Monitoring | MonitorState::Warning => inner.last_activity_ms,
                MonitorState::Inactive | MonitorState::LoggedOut(_) => return CheckOutcome::Skipped,
            }
        };
        self.checks_run.fetch_add(1, Ordering::Relaxed);

        // Read fresh every time; a renewal may have replaced it
        let Some(token) = self.state.token() else {
            return self.force_logout(LogoutReason::NoToken);
        };
        let expires_at_ms = match token::expiry_millis(&token) {
            Ok(expiry) => expiry,
            Err(e) => {
                tracing::warn!(error = %e, "Persisted token has no usable expiry");
                return self.force_logout(LogoutReason::InvalidToken);
            }
        };

        let remaining_ms = expires_at_ms - now;
        if remaining_ms <= 0 {
            return self.force_logout(LogoutReason::Expired);
        }
        if now - last_activity_ms >= duration_ms(self.config.idle_timeout()) {
            return self.force_logout(LogoutReason::IdleTimeout);
        }

        if remaining_ms <= duration_ms(self.config.warning_lead()) {
            let raised = {
                let mut inner = self.lock_inner();
                if inner.state.is_terminal() || inner.state == MonitorState::Inactive {
                    return CheckOutcome::Skipped;
                }
                if inner.warning_shown {
                    false
                } else {
                    inner.warning_shown = true;
                    inner.state = MonitorState::Warning;
                    true
                }
            };
            if !raised {
                return CheckOutcome::Healthy;
            }
            tracing::info!(remaining_ms, "Session about to expire, prompting for renewal");
            self.host
                .show_expiry_warning(Duration::from_millis(remaining_ms as u64));
            return CheckOutcome::WarningRaised { remaining_ms };
        }

        let cleared = {
            let mut inner = self.lock_inner();
            if inner.state == MonitorState::Warning {
                inner.state = MonitorState::Monitoring;
                inner.warning_shown = false;
                true
            } else {
                false
            }
        };
        if cleared {
            tracing::debug!("Token renewed elsewhere, clearing renewal prompt");
            self.host.clear_expiry_warning();
            return CheckOutcome::WarningCleared;
        }
        CheckOutcome::Healthy
    }

    /// Reset the idle clock. Never blocks beyond a short lock.
    pub fn record_activity(&self, kind: ActivityKind) {
        let now = self.clock.now_millis();
        let mut inner = self.lock_inner();
        if matches!(inner.state, MonitorState::Monitoring | MonitorState::Warning) {
            inner.last_activity_ms = now;
            tracing::trace!(?kind, "Activity recorded");
        }
    }

    /// Renew the session token.
    ///
    /// Only one renewal may be in flight; a concurrent call returns
    /// [`SessionError::RenewalInFlight`] without touching the network. On
    /// failure the error is surfaced, and after the configured delay the
    /// session is ended with [`LogoutReason::RefreshFailed`].
    pub async fn renew(&self, renewer: &dyn TokenRenewer) -> Result<(), SessionError> {
        if !matches!(
            self.state(),
            MonitorState::Monitoring | MonitorState::Warning
        ) {
            return Err(SessionError::NotMonitoring);
        }
        let _guard = RenewalGuard::acquire(&self.renewing).ok_or(SessionError::RenewalInFlight)?;
        let language = self.state.language();

        let Some(current) = self.state.token() else {
            self.force_logout(LogoutReason::NoToken);
            return Err(SessionError::Renewal("no token to renew".into()));
        };

        let generation = self.generation.load(Ordering::SeqCst);
        let result = match renewer.renew(&current).await {
            Ok(fresh) => self.store_renewed_token(generation, &fresh)?,
            Err(e) => Err(e.to_string()),
        };

        match result {
            Ok(()) => {
                let cleared = {
                    let mut inner = self.lock_inner();
                    inner.warning_shown = false;
                    if inner.state == MonitorState::Warning {
                        inner.state = MonitorState::Monitoring;
                        true
                    } else {
                        false
                    }
                };
                if cleared {
                    self.host.clear_expiry_warning();
                }
                tracing::info!("Session renewed");
                self.notifier
                    .notify(Notification::success(messages::renewal_succeeded(language)));
                Ok(())
            }
            Err(reason) => {
                tracing::error!(error = %reason, "Session renewal failed");
                self.notifier
                    .notify(Notification::error(messages::renewal_failed(language)));
                tokio::time::sleep(self.config.renewal_failure_delay()).await;
                self.force_logout(LogoutReason::RefreshFailed);
                Err(SessionError::Renewal(reason))
            }
        }
    }

    /// Persist a renewed token, unless the session ended or the view was
    /// remounted while the request was out; the token is then discarded.
    fn store_renewed_token(
        &self,
        generation: u64,
        fresh: &str,
    ) -> Result<Result<(), String>, SessionError> {
        let mut inner = self.lock_inner();
        if !self.is_current(generation)
            || !matches!(inner.state, MonitorState::Monitoring | MonitorState::Warning)
        {
            tracing::warn!(state = ?inner.state, "Session ended during renewal, token discarded");
            return Err(SessionError::NotMonitoring);
        }
        let stored = self.state.replace_token(fresh).map_err(|e| e.to_string());
        if stored.is_ok() {
            inner.last_activity_ms = self.clock.now_millis();
        }
        Ok(stored)
    }

    /// User-initiated logout
    pub fn logout(&self) -> CheckOutcome {
        self.force_logout(LogoutReason::UserLogout)
    }

    pub fn state(&self) -> MonitorState {
        self.lock_inner().state
    }

    /// Current view of the session, if one is being monitored and its token is readable
    pub fn snapshot(&self) -> Option<SessionSnapshot> {
        let (last_activity_ms, warning_shown) = {
            let inner = self.lock_inner();
            if !matches!(inner.state, MonitorState::Monitoring | MonitorState::Warning) {
                return None;
            }
            (inner.last_activity_ms, inner.warning_shown)
        };
        let token = self.state.token()?;
        let expires_at_ms = token::expiry_millis(&token).ok()?;
        Some(SessionSnapshot {
            token,
            expires_at_ms,
            last_activity_ms,
            warning_shown,
        })
    }

    /// Number of checks that evaluated a session
    pub fn checks_run(&self) -> u64 {
        self.checks_run.load(Ordering::Relaxed)
    }

    fn force_logout(&self, reason: LogoutReason) -> CheckOutcome {
        {
            let mut inner = self.lock_inner();
            if inner.state.is_terminal() {
                return CheckOutcome::Skipped;
            }
            inner.state = MonitorState::LoggedOut(reason);
            inner.warning_shown = false;
        }

        if let Err(e) = self.state.clear_session() {
            tracing::error!(error = %e, "Failed to clear persisted session");
        }
        tracing::info!(reason = %reason, "Session ended");
        self.host.logged_out(reason);
        CheckOutcome::LoggedOut(reason)
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    fn teardown(&self, generation: u64) {
        if self
            .generation
            .compare_exchange(generation, generation + 1, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            // A newer mount already replaced this one
            return;
        }
        self.abort_task();
        let mut inner = self.lock_inner();
        if !inner.state.is_terminal() {
            inner.state = MonitorState::Inactive;
        }
        tracing::debug!(generation, "Session monitor torn down");
    }

    fn abort_task(&self) {
        if let Some(task) = self.task.lock().unwrap_or_else(|e| e.into_inner()).take() {
            task.abort();
        }
    }

    fn lock_inner(&self) -> MutexGuard<'_, MonitorInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn duration_ms(duration: Duration) -> i64 {
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}

/// Releases the in-flight flag however the renewal ends
struct RenewalGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> RenewalGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for RenewalGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// One mount of the watchdog.
///
/// Activity and visibility entry points only reach the monitor while this
/// mount is current. Dropping the handle tears the mount down.
pub struct MonitorHandle {
    monitor: Arc<SessionMonitor>,
    generation: u64,
}

impl MonitorHandle {
    pub fn record_activity(&self, kind: ActivityKind) {
        if self.monitor.is_current(self.generation) {
            self.monitor.record_activity(kind);
        }
    }

    /// The host view came back to the foreground; check immediately
    pub fn visibility_regained(&self) -> CheckOutcome {
        if self.monitor.is_current(self.generation) {
            self.monitor.check()
        } else {
            CheckOutcome::Skipped
        }
    }

    /// Whether this mount is still the live one
    pub fn is_current(&self) -> bool {
        self.monitor.is_current(self.generation)
    }

    pub fn monitor(&self) -> &Arc<SessionMonitor> {
        &self.monitor
    }

    /// Stop the timer and detach the entry points
    pub fn teardown(self) {
        drop(self);
    }
}

impl Drop for MonitorHandle {
    fn drop(&mut self) {
        self.monitor.teardown(self.generation);
    }
}
