//! Client for driving a Chromium-family browser over the devtools wire
//! protocol.
//!
//! The crate keeps an event-driven mirror of the browser's target tree,
//! frame tree, network activity and navigation lifecycle and exposes high
//! level operations on top of it.
//!
//! Connecting yields a [`Browser`] and a [`Handler`]; the handler is a
//! stream that must be driven for anything to make progress:
//!
//! ```no_run
//! use chromite::{Browser, BrowserConfig};
//! use futures::StreamExt;
//!
//! # async fn run() -> chromite::Result<()> {
//! let (browser, mut handler) = Browser::connect(BrowserConfig::new(
//!     "ws://127.0.0.1:9222/devtools/browser/...",
//! ))
//! .await?;
//!
//! async_std::task::spawn(async move {
//!     while let Some(event) = handler.next().await {
//!         if event.is_err() {
//!             break;
//!         }
//!     }
//! });
//!
//! let page = browser.new_page("https://en.wikipedia.org").await?;
//! let title = page.evaluate("document.title").await?;
//! # Ok(())
//! # }
//! ```

pub use chromite_cdp::cdp;

pub mod browser;
pub mod cmd;
pub mod conn;
pub mod dialog;
pub mod error;
pub mod fanout;
pub mod handler;
pub mod js;
pub mod listeners;
pub mod page;
pub mod utils;

pub use crate::browser::{Browser, BrowserConfig};
pub use crate::dialog::Dialog;
pub use crate::error::{CdpError, Result};
pub use crate::fanout::{InvocationList, Subscriber};
pub use crate::handler::emulation::Viewport;
pub use crate::handler::frame::{NavigationOptions, WaitUntil};
pub use crate::handler::network::{Credentials, HttpRequest, HttpResponse};
pub use crate::handler::Handler;
pub use crate::js::EvaluationResult;
pub use crate::page::{AddScriptTagOptions, Page};

use std::sync::Arc;

/// Handle to the request that loaded a document, if the network mirror saw
/// one.
pub type ArcHttpRequest = Option<Arc<HttpRequest>>;
