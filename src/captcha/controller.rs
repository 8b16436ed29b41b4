//! Decides which captcha tasks go to a solving service and drives them.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::task::JoinHandle;

use crate::config::ImageTyperzConfig;
use crate::events::{
    CaptchaClaimedEvent, CaptchaOutcomeEvent, EventDispatcher, HookEvent, RefundEvent,
};
use crate::transport::HttpTransport;

use super::{CaptchaResult, CaptchaService, CaptchaServiceClient, CaptchaTask, Credentials};

const DEFAULT_WAIT_HINT_SECS: u64 = 100;

/// Host state consulted before claiming a task.
pub trait HostState: Send + Sync {
    /// A user interface is attached and could solve captchas itself.
    fn is_client_connected(&self) -> bool;
}

/// Why a task was left for someone else.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclineReason {
    Ineligible,
    BalanceUnavailable,
    InsufficientCredits,
    AlreadyClaimed,
}

/// Result of offering a task to the controller.
#[derive(Debug)]
pub enum HandleOutcome {
    Declined(DeclineReason),
    /// The task was claimed and its submission runs on the returned task.
    Dispatched(JoinHandle<()>),
}

impl HandleOutcome {
    pub fn is_dispatched(&self) -> bool {
        matches!(self, HandleOutcome::Dispatched(_))
    }

    /// Wait for the background submission, if any.
    pub async fn join(self) {
        if let HandleOutcome::Dispatched(handle) = self
            && let Err(err) = handle.await
        {
            log::error!("captcha submission task aborted: {err}");
        }
    }
}

/// Gatekeeper between host captcha tasks and one solving service.
pub struct CaptchaTaskController {
    service: Arc<dyn CaptchaService>,
    credentials: Credentials,
    check_client: bool,
    wait_hint: Duration,
    events: Arc<EventDispatcher>,
}

impl CaptchaTaskController {
    pub fn new(service: Arc<dyn CaptchaService>, credentials: Credentials) -> Self {
        Self {
            service,
            credentials,
            check_client: true,
            wait_hint: Duration::from_secs(DEFAULT_WAIT_HINT_SECS),
            events: Arc::new(EventDispatcher::with_logging()),
        }
    }

    /// Controller backed by an ImageTyperz client.
    pub fn imagetyperz(
        transport: Arc<dyn HttpTransport>,
        config: &ImageTyperzConfig,
    ) -> CaptchaResult<Self> {
        let client = CaptchaServiceClient::imagetyperz(transport, config)?;
        Ok(Self::new(Arc::new(client), config.credentials())
            .with_check_client(config.check_client)
            .with_wait_hint(config.wait_hint()))
    }

    pub fn with_check_client(mut self, check_client: bool) -> Self {
        self.check_client = check_client;
        self
    }

    pub fn with_wait_hint(mut self, wait_hint: Duration) -> Self {
        self.wait_hint = wait_hint;
        self
    }

    pub fn with_events(mut self, events: Arc<EventDispatcher>) -> Self {
        self.events = events;
        self
    }

    pub fn service_name(&self) -> &str {
        self.service.name()
    }

    /// Whether this service may take `task` at all.
    pub fn is_eligible(&self, task: &CaptchaTask, host: &dyn HostState) -> bool {
        if task.service().is_some() {
            return false;
        }

        if !task.is_textual() {
            return false;
        }

        if !self.credentials.is_complete() {
            return false;
        }

        !(self.check_client && host.is_client_connected())
    }

    /// Host entry point: eligibility check followed by [`Self::handle`].
    pub async fn captcha_task(
        &self,
        task: Arc<CaptchaTask>,
        host: &dyn HostState,
    ) -> HandleOutcome {
        if !self.is_eligible(&task, host) {
            return HandleOutcome::Declined(DeclineReason::Ineligible);
        }
        self.handle(task).await
    }

    /// Check credits, claim `task` and start solving it in the background.
    pub async fn handle(&self, task: Arc<CaptchaTask>) -> HandleOutcome {
        let name = self.service.name().to_string();

        let balance = match self.service.get_balance().await {
            Ok(balance) => balance,
            Err(err) => {
                log::warn!("{name} balance check failed: {err}");
                return HandleOutcome::Declined(DeclineReason::BalanceUnavailable);
            }
        };

        if balance.is_nan() || balance <= 0.0 {
            log::info!("Your {name} account has not enough credits");
            return HandleOutcome::Declined(DeclineReason::InsufficientCredits);
        }

        if !task.try_claim(&name) {
            log::debug!("{name} lost the claim race for a captcha task");
            return HandleOutcome::Declined(DeclineReason::AlreadyClaimed);
        }
        task.set_waiting(self.wait_hint);

        self.events.dispatch(HookEvent::CaptchaClaimed(CaptchaClaimedEvent {
            service: name.clone(),
            balance,
            wait_hint: self.wait_hint,
            timestamp: Utc::now(),
        }));

        let service = self.service.clone();
        let events = self.events.clone();
        let handle = tokio::spawn(async move {
            let started = Instant::now();
            match service.submit(task.image()).await {
                Ok(solution) => {
                    task.complete(solution.ticket.clone(), solution.text);
                    events.dispatch(HookEvent::CaptchaSolved(CaptchaOutcomeEvent {
                        service: name,
                        ticket: Some(solution.ticket),
                        error: None,
                        latency: started.elapsed(),
                        timestamp: Utc::now(),
                    }));
                }
                Err(err) => {
                    let code = err.code();
                    task.set_error(code.clone());
                    events.dispatch(HookEvent::CaptchaFailed(CaptchaOutcomeEvent {
                        service: name,
                        ticket: None,
                        error: Some(code),
                        latency: started.elapsed(),
                        timestamp: Utc::now(),
                    }));
                }
            }
        });

        HandleOutcome::Dispatched(handle)
    }

    /// The host found the solution of `task` wrong; ask for a refund if this
    /// service produced it.
    pub async fn handle_invalid(&self, task: &CaptchaTask) {
        if task.service().as_deref() != Some(self.service.name()) {
            return;
        }

        let Some(ticket) = task.ticket() else {
            return;
        };

        let reply = self.service.refund(&ticket).await;
        self.events.dispatch(HookEvent::Refund(RefundEvent {
            service: self.service.name().to_string(),
            ticket,
            accepted: reply.accepted,
            response: reply.response,
            timestamp: Utc::now(),
        }));
    }
}
