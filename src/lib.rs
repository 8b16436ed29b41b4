//! # hoster-hooks
//!
//! Download-manager extensions written against a small async transport
//! abstraction: a hook that forwards text captchas to a paid solving service
//! (ImageTyperz) and a set of per-site plugins for account login, free
//! downloads and multi-hoster host lists.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use hoster_hooks::captcha::{CaptchaImage, CaptchaTask, CaptchaTaskController, TaskKind};
//! use hoster_hooks::config::ImageTyperzConfig;
//! use hoster_hooks::transport::ReqwestTransport;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let transport = Arc::new(ReqwestTransport::new()?);
//!     let config = ImageTyperzConfig::default().with_credentials("user", "secret");
//!     let controller = CaptchaTaskController::imagetyperz(transport, &config)?;
//!
//!     let task = Arc::new(CaptchaTask::new(
//!         CaptchaImage::Path("captcha.png".into()),
//!         TaskKind::Textual,
//!     ));
//!     controller.handle(task.clone()).await.join().await;
//!     println!("solved: {:?}", task.result());
//!     Ok(())
//! }
//! ```

pub mod captcha;
pub mod config;
pub mod events;
pub mod plugins;
pub mod transport;

pub use crate::captcha::{
    CaptchaError,
    CaptchaImage,
    CaptchaResult,
    CaptchaService,
    CaptchaServiceClient,
    CaptchaSolution,
    CaptchaTask,
    CaptchaTaskController,
    Credentials,
    HandleOutcome,
    HostState,
    RefundReply,
    TaskKind,
    TaskStatus,
};

pub use crate::config::{ConfigError, HookConfig};

pub use crate::events::{EventDispatcher, EventHandler, HookEvent, LoggingHandler};

pub use crate::plugins::{
    AccountInfo,
    AccountPlugin,
    DownloadLink,
    HosterPlugin,
    MultiHosterPlugin,
    PluginError,
    PluginRegistry,
    PluginResult,
};

pub use crate::transport::{HttpTransport, ReqwestTransport, TransportError};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
