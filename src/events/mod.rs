//! Event system for plugin activity.
//!
//! Provides hooks for logging and custom reactions around captcha handling
//! and multi-hoster refreshes.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;

/// A service claimed a captcha task.
#[derive(Debug, Clone)]
pub struct CaptchaClaimedEvent {
    pub service: String,
    pub balance: f64,
    pub wait_hint: Duration,
    pub timestamp: DateTime<Utc>,
}

/// A background submission finished.
#[derive(Debug, Clone)]
pub struct CaptchaOutcomeEvent {
    pub service: String,
    pub ticket: Option<String>,
    pub error: Option<String>,
    pub latency: Duration,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct RefundEvent {
    pub service: String,
    pub ticket: String,
    pub accepted: bool,
    /// Vendor answer, if the request got one.
    pub response: Option<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct HosterListEvent {
    pub plugin: String,
    pub hosters: usize,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub enum HookEvent {
    CaptchaClaimed(CaptchaClaimedEvent),
    CaptchaSolved(CaptchaOutcomeEvent),
    CaptchaFailed(CaptchaOutcomeEvent),
    Refund(RefundEvent),
    HosterListLoaded(HosterListEvent),
}

/// Trait implemented by event handlers.
pub trait EventHandler: Send + Sync {
    fn handle(&self, event: &HookEvent);
}

/// Dispatcher that broadcasts events to registered handlers.
#[derive(Default)]
pub struct EventDispatcher {
    handlers: Vec<Arc<dyn EventHandler>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self { handlers: Vec::new() }
    }

    /// Dispatcher with only the [`LoggingHandler`] registered.
    pub fn with_logging() -> Self {
        let mut dispatcher = Self::new();
        dispatcher.register_handler(Arc::new(LoggingHandler));
        dispatcher
    }

    pub fn register_handler(&mut self, handler: Arc<dyn EventHandler>) {
        self.handlers.push(handler);
    }

    pub fn dispatch(&self, event: HookEvent) {
        for handler in &self.handlers {
            handler.handle(&event);
        }
    }
}

/// Logs events using the `log` crate.
#[derive(Debug)]
pub struct LoggingHandler;

impl EventHandler for LoggingHandler {
    fn handle(&self, event: &HookEvent) {
        match event {
            HookEvent::CaptchaClaimed(claimed) => {
                log::info!(
                    "{} claimed captcha (balance {:.2}, expect {}s)",
                    claimed.service,
                    claimed.balance,
                    claimed.wait_hint.as_secs()
                );
            }
            HookEvent::CaptchaSolved(solved) => {
                log::info!(
                    "{} solved captcha, ticket {} ({:.2}s)",
                    solved.service,
                    solved.ticket.as_deref().unwrap_or("-"),
                    solved.latency.as_secs_f64()
                );
            }
            HookEvent::CaptchaFailed(failed) => {
                log::warn!(
                    "{} failed to solve captcha: {}",
                    failed.service,
                    failed.error.as_deref().unwrap_or("unknown error")
                );
            }
            HookEvent::Refund(refund) if refund.accepted => {
                log::info!("Bad captcha solution received, requested refund ({})", refund.service);
            }
            HookEvent::Refund(refund) => log::error!("{}", refund_failure_message(refund)),
            HookEvent::HosterListLoaded(list) => {
                log::debug!("{} supports {} hosters", list.plugin, list.hosters);
            }
        }
    }
}

fn refund_failure_message(refund: &RefundEvent) -> String {
    format!(
        "Bad captcha solution received, refund request failed ({}, ticket {}): {}",
        refund.service,
        refund.ticket,
        refund.response.as_deref().unwrap_or("no response")
    )
}
