use crate::actions::{visibility_script, BrowserActions};
use crate::error::{BrowserError, Result};
use crate::session::{Session, StoredCookie};
use chromiumoxide::browser::{Browser, BrowserConfig as CdpConfig};
use chromiumoxide::cdp::browser_protocol::browser::BrowserContextId;
use chromiumoxide::cdp::browser_protocol::network::{Cookie, CookieParam, TimeSinceEpoch};
use chromiumoxide::cdp::browser_protocol::target::{
    CreateBrowserContextParams, CreateTargetParams, DisposeBrowserContextParams,
};
use chromiumoxide::Page;
use futures::stream::StreamExt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use varia_core::BrowserConfig;

/// Polling interval for selector waits.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Browser automation engine
///
/// Owns one Chromium process. Every worker and the login flow get their own
/// [`BrowserContext`], which is an isolated CDP browser context with its own
/// cookie jar.
pub struct BrowserEngine {
    browser: Browser,
    handler: JoinHandle<()>,
    navigation_timeout: Duration,
}

impl BrowserEngine {
    /// Launch Chromium with the given settings
    pub async fn launch(config: &BrowserConfig) -> Result<Self> {
        let mut builder = CdpConfig::builder()
            .no_sandbox()
            .window_size(config.window_width, config.window_height)
            .request_timeout(Duration::from_secs(config.navigation_timeout_secs));

        if !config.headless {
            builder = builder.with_head();
        }
        if let Some(user_agent) = &config.user_agent {
            builder = builder.arg(format!("--user-agent={user_agent}"));
        }

        let cdp_config = builder.build().map_err(BrowserError::ChromiumError)?;

        let (browser, mut handler) = Browser::launch(cdp_config).await?;

        // Spawn browser handler
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!("CDP handler event error: {}", e);
                }
            }
        });

        tracing::info!(headless = config.headless, "Browser launched");

        Ok(Self {
            browser,
            handler,
            navigation_timeout: Duration::from_secs(config.navigation_timeout_secs),
        })
    }

    /// Open a fresh isolated context, seeded with the session's cookies.
    pub async fn new_context(self: &Arc<Self>, session: Option<&Session>) -> Result<BrowserContext> {
        let created = self
            .browser
            .execute(CreateBrowserContextParams::default())
            .await?;
        let context_id = created.result.browser_context_id.clone();

        let target = CreateTargetParams::builder()
            .url("about:blank")
            .browser_context_id(context_id.clone())
            .build()
            .map_err(BrowserError::ChromiumError)?;
        let page = self.browser.new_page(target).await?;

        if let Some(session) = session {
            let cookies = session
                .cookies
                .iter()
                .map(cookie_param)
                .collect::<Result<Vec<_>>>()?;
            if !cookies.is_empty() {
                page.set_cookies(cookies).await?;
            }
        }

        Ok(BrowserContext {
            engine: Arc::clone(self),
            page,
            context_id,
            closed: AtomicBool::new(false),
        })
    }

    /// Close the browser process.
    pub async fn shutdown(mut self) {
        if let Err(e) = self.browser.close().await {
            tracing::warn!("Failed to close browser cleanly: {}", e);
        }
        let _ = self.browser.wait().await;
        self.handler.abort();
    }
}

/// One isolated browsing context with a single page.
pub struct BrowserContext {
    engine: Arc<BrowserEngine>,
    page: Page,
    context_id: BrowserContextId,
    closed: AtomicBool,
}

impl BrowserContext {
    /// Export the context's cookies as a session blob.
    pub async fn session(&self) -> Result<Session> {
        let cookies = self.page.get_cookies().await?;
        Ok(Session::new(cookies.into_iter().map(stored_cookie).collect()))
    }

    /// Replace the context's cookies with those of `session`.
    pub async fn restore(&self, session: &Session) -> Result<()> {
        let cookies = session
            .cookies
            .iter()
            .map(cookie_param)
            .collect::<Result<Vec<_>>>()?;
        if !cookies.is_empty() {
            self.page.set_cookies(cookies).await?;
        }
        Ok(())
    }

    /// Dispose the underlying browser context. Safe to call more than once.
    pub async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.engine
            .browser
            .execute(DisposeBrowserContextParams::new(self.context_id.clone()))
            .await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl BrowserActions for BrowserContext {
    async fn close(&self) -> Result<()> {
        BrowserContext::close(self).await
    }

    async fn navigate(&self, url: &str) -> Result<()> {
        match tokio::time::timeout(self.engine.navigation_timeout, self.page.goto(url)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(BrowserError::NavigationError(format!("{url}: {e}"))),
            Err(_) => Err(BrowserError::Timeout(format!("navigating to {url}"))),
        }
    }

    async fn fill_field(&self, selector: &str, value: &str) -> Result<()> {
        let element = self
            .page
            .find_element(selector)
            .await
            .map_err(|_| BrowserError::SelectorNotFound(selector.to_string()))?;
        element.click().await?;
        element
            .call_js_fn("function() { this.value = ''; }", false)
            .await?;
        element.type_str(value).await?;
        Ok(())
    }

    async fn click(&self, selector: &str) -> Result<()> {
        let element = self
            .page
            .find_element(selector)
            .await
            .map_err(|_| BrowserError::SelectorNotFound(selector.to_string()))?;
        element.click().await?;
        Ok(())
    }

    async fn wait_for_selector(&self, selector: &str, timeout_ms: u64) -> Result<()> {
        let deadline = Instant::now() + Duration::from_millis(timeout_ms);
        loop {
            if self.page.find_element(selector).await.is_ok() {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(BrowserError::Timeout(format!(
                    "waiting {timeout_ms}ms for {selector}"
                )));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn extract_text(&self, selector: &str) -> Result<String> {
        let element = self
            .page
            .find_element(selector)
            .await
            .map_err(|_| BrowserError::SelectorNotFound(selector.to_string()))?;
        Ok(element.inner_text().await?.unwrap_or_default())
    }

    async fn is_visible(&self, selector: &str) -> Result<bool> {
        let value = self.evaluate(&visibility_script(selector)).await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self.page.url().await?.unwrap_or_default())
    }

    async fn evaluate(&self, script: &str) -> Result<serde_json::Value> {
        let result = self.page.evaluate(script).await?;
        Ok(result.value().cloned().unwrap_or(serde_json::Value::Null))
    }
}

fn stored_cookie(cookie: Cookie) -> StoredCookie {
    StoredCookie {
        name: cookie.name,
        value: cookie.value,
        domain: cookie.domain,
        path: cookie.path,
        expires: (!cookie.session).then_some(cookie.expires),
        secure: cookie.secure,
        http_only: cookie.http_only,
    }
}

fn cookie_param(cookie: &StoredCookie) -> Result<CookieParam> {
    let mut builder = CookieParam::builder()
        .name(cookie.name.clone())
        .value(cookie.value.clone())
        .domain(cookie.domain.clone())
        .path(cookie.path.clone())
        .secure(cookie.secure)
        .http_only(cookie.http_only);
    if let Some(expires) = cookie.expires {
        builder = builder.expires(TimeSinceEpoch::new(expires));
    }
    builder.build().map_err(BrowserError::ChromiumError)
}
