//! Headless browser session driving rendered-page navigation.
//!
//! One [`BrowserSession`] is launched per harvest run and every HTML task
//! goes through it, one page at a time. Launch failure is the only fault
//! in the engine that aborts a run; per-page failures surface as
//! [`RenderError`] and the session stays alive.

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
use chromiumoxide::cdp::browser_protocol::page::NavigateParams;
use chromiumoxide::{Browser, BrowserConfig};
use futures::StreamExt;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use super::error::HarvestRunError;
use super::render::{PageRenderer, RenderError};
use crate::config::HarvestConfig;
use crate::user_agent::{ACCEPT_LANGUAGE, HARVEST_USER_AGENT, NAVIGATION_REFERRER};

/// Resolves when the document has finished loading, or after an in-page
/// fallback timeout so the evaluate call itself cannot hang forever.
const READY_STATE_SCRIPT: &str = r"
    new Promise((resolve) => {
        if (document.readyState === 'complete' || document.readyState === 'interactive') {
            resolve(document.readyState);
        } else {
            document.addEventListener('DOMContentLoaded', () => resolve(document.readyState));
            setTimeout(() => resolve('timeout'), 10000);
        }
    })
";

/// A live browser owned for the duration of one harvest run.
pub struct BrowserSession {
    browser: Browser,
    handler_task: JoinHandle<()>,
    page_load_timeout: Duration,
    settle_delay: Duration,
}

impl BrowserSession {
    /// Launches the browser and starts draining its CDP event stream.
    ///
    /// # Errors
    ///
    /// Returns [`HarvestRunError::BrowserConfig`] when the launch
    /// configuration is rejected and [`HarvestRunError::BrowserLaunch`]
    /// when the browser process cannot start. Both are fatal for the run.
    #[instrument(skip_all)]
    pub async fn launch(config: &HarvestConfig) -> Result<Self, HarvestRunError> {
        info!(headless = config.headless, "launching browser");

        let mut builder = BrowserConfig::builder();
        // with_head means NOT headless.
        if !config.headless {
            builder = builder.with_head();
        }
        let browser_config = builder
            .arg("--no-sandbox")
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .build()
            .map_err(HarvestRunError::BrowserConfig)?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| HarvestRunError::BrowserLaunch(e.to_string()))?;

        // The CDP event stream must be polled or every command stalls.
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        Ok(Self {
            browser,
            handler_task,
            page_load_timeout: config.page_load_timeout(),
            settle_delay: config.settle_delay(),
        })
    }

    /// Shuts the browser down and stops the event-drain task.
    pub async fn close(mut self) {
        if let Err(error) = self.browser.close().await {
            warn!(%error, "browser close failed");
        }
        self.handler_task.abort();
    }
}

#[async_trait]
impl PageRenderer for BrowserSession {
    async fn render(&mut self, url: &str) -> Result<String, RenderError> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| RenderError::navigation(format!("failed to open page: {e}")))?;

        // Override identity before any navigation happens on the page.
        let ua_override = SetUserAgentOverrideParams::builder()
            .user_agent(HARVEST_USER_AGENT)
            .accept_language(ACCEPT_LANGUAGE)
            .build()
            .map_err(RenderError::navigation)?;
        page.execute(ua_override)
            .await
            .map_err(|e| RenderError::navigation(format!("user-agent override failed: {e}")))?;

        let nav = NavigateParams::builder()
            .url(url)
            .referrer(NAVIGATION_REFERRER)
            .build()
            .map_err(|e| RenderError::navigation(format!("invalid URL {url}: {e}")))?;

        let render_result = async {
            tokio::time::timeout(self.page_load_timeout, page.execute(nav))
                .await
                .map_err(|_| RenderError::Timeout)?
                .map_err(|e| RenderError::navigation(format!("navigation failed: {e}")))?;

            match tokio::time::timeout(
                self.page_load_timeout,
                page.evaluate(READY_STATE_SCRIPT.to_string()),
            )
            .await
            {
                Ok(Ok(ready)) => {
                    let state: String = ready
                        .into_value()
                        .unwrap_or_else(|_| "unknown".to_string());
                    debug!(state = %state, "page ready");
                }
                Ok(Err(error)) => {
                    debug!(%error, "ready-state check failed, reading DOM anyway");
                }
                Err(_) => return Err(RenderError::Timeout),
            }

            // Give late scripts a moment to fill in content containers.
            tokio::time::sleep(self.settle_delay).await;

            page.content()
                .await
                .map_err(|e| RenderError::navigation(format!("failed to read page content: {e}")))
        }
        .await;

        // The page is closed on every path so a failed task does not leak
        // tabs into later tasks.
        if let Err(error) = page.close().await {
            debug!(%error, "page close failed");
        }

        render_result
    }
}
