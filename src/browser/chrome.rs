//! Headless Chromium session over CDP.

use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::network::{EnableParams, SetBlockedUrLsParams, SetUserAgentOverrideParams};
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::{Browser, BrowserConfig, Handler, Page};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::browser::PageDriver;
use crate::error::{Error, Result};
use crate::options::BrowserOptions;

/// Chrome flags for unattended capture.
const LAUNCH_ARGS: &[&str] = &[
    "--no-sandbox",
    "--disable-gpu",
    "--disable-dev-shm-usage",
    "--hide-scrollbars",
    "--mute-audio",
    "--no-first-run",
    "--no-default-browser-check",
];

/// One browser and one tab, owned by a single job.
pub struct BrowserSession {
    browser: Browser,
    page: Option<Page>,
    handler_task: JoinHandle<()>,
    request_timeout: Duration,
    closed: bool,
}

impl BrowserSession {
    /// Launch a headless browser and open a blank tab.
    ///
    /// The resource block-list is applied best effort; a browser that
    /// refuses it still loads the page.
    #[instrument(skip(options))]
    pub async fn launch(options: &BrowserOptions) -> Result<Self> {
        let mut builder = BrowserConfig::builder()
            .window_size(options.window_width, options.window_height)
            .request_timeout(options.request_timeout())
            .args(LAUNCH_ARGS.iter().copied());
        if let Some(executable) = &options.executable {
            builder = builder.chrome_executable(executable);
        }
        let config = builder.build().map_err(Error::SessionCrash)?;

        let (browser, handler) = Browser::launch(config)
            .await
            .map_err(|e| Error::SessionCrash(format!("launch failed: {e}")))?;
        let handler_task = spawn_handler_task(handler);

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| Error::SessionCrash(format!("new tab failed: {e}")))?;

        if let Some(user_agent) = &options.user_agent {
            if let Err(e) = page.execute(SetUserAgentOverrideParams::new(user_agent.clone())).await {
                warn!(error = %e, "user agent override refused");
            }
        }

        if options.block_resources && !options.blocked_url_patterns.is_empty() {
            let blocked = async {
                page.execute(EnableParams::default()).await?;
                page.execute(SetBlockedUrLsParams::new(options.blocked_url_patterns.clone()))
                    .await
            };
            match blocked.await {
                Ok(_) => debug!(patterns = options.blocked_url_patterns.len(), "resource block-list applied"),
                Err(e) => warn!(error = %e, "resource block-list refused"),
            }
        }

        info!("browser session ready");
        Ok(Self {
            browser,
            page: Some(page),
            handler_task,
            request_timeout: options.request_timeout(),
            closed: false,
        })
    }

    fn page(&self) -> Result<&Page> {
        self.page
            .as_ref()
            .ok_or_else(|| Error::SessionCrash("page already closed".to_string()))
    }
}

fn spawn_handler_task(mut handler: Handler) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = handler.next().await {
            if let Err(e) = event {
                debug!(error = %e, "CDP handler event error");
            }
        }
    })
}

#[async_trait]
impl PageDriver for BrowserSession {
    #[instrument(skip(self))]
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<()> {
        let page = self.page()?;
        match tokio::time::timeout(timeout, page.goto(url)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(Error::extraction("loading", e.to_string())),
            Err(_) => Err(Error::NavigationTimeout {
                url: url.to_string(),
                timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            }),
        }
    }

    async fn evaluate(&mut self, script: &str) -> Result<serde_json::Value> {
        let page = self.page()?;
        let result = tokio::time::timeout(self.request_timeout, page.evaluate(script))
            .await
            .map_err(|_| Error::extraction("evaluate", "script timed out"))?
            .map_err(|e| Error::extraction("evaluate", e.to_string()))?;
        Ok(result.into_value::<serde_json::Value>().unwrap_or(serde_json::Value::Null))
    }

    async fn content(&mut self) -> Result<String> {
        let page = self.page()?;
        tokio::time::timeout(self.request_timeout, page.content())
            .await
            .map_err(|_| Error::SessionCrash("snapshot timed out".to_string()))?
            .map_err(|e| Error::SessionCrash(format!("snapshot failed: {e}")))
    }

    async fn screenshot(&mut self) -> Result<Vec<u8>> {
        let page = self.page()?;
        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .full_page(true)
            .build();
        tokio::time::timeout(self.request_timeout, page.screenshot(params))
            .await
            .map_err(|_| Error::extraction("screenshot", "timed out"))?
            .map_err(|e| Error::extraction("screenshot", e.to_string()))
    }

    async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        if let Some(page) = self.page.take() {
            if let Err(e) = page.close().await {
                debug!(error = %e, "tab close failed");
            }
        }
        if let Err(e) = self.browser.close().await {
            debug!(error = %e, "browser close failed");
        }
        if let Err(e) = self.browser.wait().await {
            debug!(error = %e, "browser wait failed");
        }
        self.handler_task.abort();
        info!("browser session closed");
        Ok(())
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        self.handler_task.abort();
    }
}
