//! Host-owned captcha task shared with the solving services.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::watch;

/// Data bag key holding the name of the service that claimed the task.
pub const SERVICE_KEY: &str = "service";
/// Data bag key holding the vendor ticket of a successful submission.
pub const TICKET_KEY: &str = "ticket";

const DEFAULT_FILE_NAME: &str = "captcha.png";

/// Captcha image, either on disk or already in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptchaImage {
    Path(PathBuf),
    Bytes(Vec<u8>),
}

impl CaptchaImage {
    pub async fn read(&self) -> std::io::Result<Vec<u8>> {
        match self {
            CaptchaImage::Path(path) => tokio::fs::read(path).await,
            CaptchaImage::Bytes(bytes) => Ok(bytes.clone()),
        }
    }

    /// File name announced in multipart uploads.
    pub fn file_name(&self) -> String {
        match self {
            CaptchaImage::Path(path) => path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| DEFAULT_FILE_NAME.to_string()),
            CaptchaImage::Bytes(_) => DEFAULT_FILE_NAME.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    /// Type the characters shown in the image.
    Textual,
    /// Click a position in the image.
    Positional,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskStatus {
    Pending,
    Waiting,
    Solved,
    Failed,
}

impl TaskStatus {
    pub fn is_done(self) -> bool {
        matches!(self, TaskStatus::Solved | TaskStatus::Failed)
    }
}

#[derive(Debug, Default)]
struct TaskState {
    data: HashMap<String, String>,
    result: Option<String>,
    error: Option<String>,
    wait_hint: Option<Duration>,
}

/// A captcha the host needs solved.
///
/// Shared behind an `Arc` between the host and whichever service claims it.
/// All fields are guarded by a single lock, so multi-field updates such as
/// storing a ticket together with its result become visible at once.
#[derive(Debug)]
pub struct CaptchaTask {
    image: CaptchaImage,
    kind: TaskKind,
    state: Mutex<TaskState>,
    status: watch::Sender<TaskStatus>,
}

impl CaptchaTask {
    pub fn new(image: CaptchaImage, kind: TaskKind) -> Self {
        let (status, _) = watch::channel(TaskStatus::Pending);
        Self {
            image,
            kind,
            state: Mutex::new(TaskState::default()),
            status,
        }
    }

    pub fn image(&self) -> &CaptchaImage {
        &self.image
    }

    pub fn kind(&self) -> TaskKind {
        self.kind
    }

    pub fn is_textual(&self) -> bool {
        self.kind == TaskKind::Textual
    }

    pub fn status(&self) -> TaskStatus {
        *self.status.borrow()
    }

    /// Receiver notified on every status change.
    pub fn subscribe(&self) -> watch::Receiver<TaskStatus> {
        self.status.subscribe()
    }

    /// Resolves once the task is solved or failed.
    pub async fn wait_done(&self) -> TaskStatus {
        let mut receiver = self.subscribe();
        match receiver.wait_for(|status| status.is_done()).await {
            Ok(status) => *status,
            Err(_) => self.status(),
        }
    }

    pub fn data(&self, key: &str) -> Option<String> {
        self.lock().data.get(key).cloned()
    }

    pub fn set_data(&self, key: impl Into<String>, value: impl Into<String>) {
        self.lock().data.insert(key.into(), value.into());
    }

    /// Name of the service that claimed the task.
    pub fn service(&self) -> Option<String> {
        self.data(SERVICE_KEY)
    }

    pub fn ticket(&self) -> Option<String> {
        self.data(TICKET_KEY)
    }

    /// Record `service` as the task's handler unless another service got
    /// there first. Returns whether the claim succeeded.
    pub fn try_claim(&self, service: &str) -> bool {
        let mut state = self.lock();
        if state.data.contains_key(SERVICE_KEY) {
            return false;
        }
        state
            .data
            .insert(SERVICE_KEY.to_string(), service.to_string());
        true
    }

    /// Advertise how long the host should expect to wait for a solution.
    pub fn set_waiting(&self, hint: Duration) {
        let mut state = self.lock();
        state.wait_hint = Some(hint);
        self.status.send_replace(TaskStatus::Waiting);
    }

    pub fn wait_hint(&self) -> Option<Duration> {
        self.lock().wait_hint
    }

    pub fn result(&self) -> Option<String> {
        self.lock().result.clone()
    }

    pub fn error(&self) -> Option<String> {
        self.lock().error.clone()
    }

    pub fn set_result(&self, result: impl Into<String>) {
        let mut state = self.lock();
        state.result = Some(result.into());
        self.status.send_replace(TaskStatus::Solved);
    }

    pub fn set_error(&self, error: impl Into<String>) {
        let mut state = self.lock();
        state.error = Some(error.into());
        self.status.send_replace(TaskStatus::Failed);
    }

    /// Store the ticket and the solved text in one update.
    pub fn complete(&self, ticket: impl Into<String>, result: impl Into<String>) {
        let mut state = self.lock();
        state.data.insert(TICKET_KEY.to_string(), ticket.into());
        state.result = Some(result.into());
        self.status.send_replace(TaskStatus::Solved);
    }

    fn lock(&self) -> MutexGuard<'_, TaskState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
