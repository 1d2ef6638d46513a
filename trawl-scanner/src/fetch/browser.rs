//! Rendered fetch strategy backed by a headless Chromium over CDP.
//!
//! The browser process lives from `open` to `close`; the engine calls
//! `close` after every session, on success and failure alike.

use super::{FetchStrategy, FetchedPage};
use crate::config::{BrowserConfig, CrawlerConfig, WaitPolicy};
use crate::error::{Result, ScanError};
use crate::links;
use async_trait::async_trait;
use chromiumoxide::Page;
use chromiumoxide::browser::{Browser, BrowserConfig as LaunchConfig};
use chromiumoxide::cdp::browser_protocol::network::LoaderId;
use chromiumoxide::cdp::browser_protocol::page::{EventLifecycleEvent, FrameId};
use chromiumoxide::listeners::EventStream;
use futures::StreamExt;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};
use url::Url;

const LINKS_SCRIPT: &str =
    "Array.from(document.querySelectorAll('a[href]')).map(a => a.href)";
const SELECTOR_POLL: Duration = Duration::from_millis(100);

pub struct RenderedFetcher {
    user_agent: String,
    options: BrowserConfig,
    browser: RwLock<Option<Browser>>,
    handler: Mutex<Option<JoinHandle<()>>>,
}

impl RenderedFetcher {
    pub fn new(config: &CrawlerConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            options: config.browser.clone(),
            browser: RwLock::new(None),
            handler: Mutex::new(None),
        }
    }

    fn launch_config(&self) -> Result<LaunchConfig> {
        let mut builder = LaunchConfig::builder()
            .request_timeout(self.options.timeout())
            .arg(format!("--user-agent={}", self.user_agent));
        if !self.options.headless {
            builder = builder.with_head();
        }
        if let Some(ref path) = self.options.executable_path {
            builder = builder.chrome_executable(path);
        }
        builder
            .build()
            .map_err(|e| ScanError::render("browser launch", e))
    }

    async fn render(&self, page: &Page, url: &Url) -> Result<FetchedPage> {
        // Subscribe before navigating so the lifecycle events of this load are buffered.
        let lifecycle = match self.options.wait {
            WaitPolicy::NetworkIdle => Some(
                page.event_listener::<EventLifecycleEvent>()
                    .await
                    .map_err(|e| ScanError::render(url.as_str(), e))?,
            ),
            _ => None,
        };
        let main_frame = page
            .mainframe()
            .await
            .map_err(|e| ScanError::render(url.as_str(), e))?;

        page.goto(url.as_str())
            .await
            .map_err(|e| ScanError::render(url.as_str(), e))?;

        let (status_code, content_type) = match page
            .wait_for_navigation_response()
            .await
            .map_err(|e| ScanError::render(url.as_str(), e))?
            .and_then(|request| request.response.clone())
        {
            Some(response) => (
                u16::try_from(response.status).unwrap_or(200),
                Some(response.mime_type),
            ),
            None => {
                debug!("No navigation response recorded for {}", url);
                (200, Some("text/html".to_string()))
            }
        };

        match (self.options.wait, lifecycle) {
            (WaitPolicy::NetworkIdle, Some(events)) => {
                wait_for_network_idle(events, main_frame.as_ref(), url).await?
            }
            (WaitPolicy::Selector, _) => self.wait_for_selector(page, url).await?,
            _ => {}
        }

        if self.options.settle_ms > 0 {
            sleep(self.options.settle()).await;
        }

        let html = page
            .content()
            .await
            .map_err(|e| ScanError::render(url.as_str(), e))?;

        let hrefs: Vec<String> = page
            .evaluate(LINKS_SCRIPT)
            .await
            .map_err(|e| ScanError::render(url.as_str(), e))?
            .into_value()
            .map_err(|e| ScanError::render(url.as_str(), e))?;

        let found: Vec<Url> = hrefs
            .iter()
            .filter_map(|href| links::normalize(href, url))
            .collect();

        Ok(FetchedPage {
            html,
            links: Some(found),
            status_code,
            content_type,
        })
    }

    async fn wait_for_selector(&self, page: &Page, url: &Url) -> Result<()> {
        let selector = self.options.wait_selector.as_str();
        loop {
            match page.find_element(selector).await {
                Ok(_) => return Ok(()),
                Err(e) => {
                    debug!("Waiting for '{}' on {}: {}", selector, url, e);
                    sleep(SELECTOR_POLL).await;
                }
            }
        }
    }
}

/// Resolve once the main frame reports `networkIdle` for the navigation that
/// started after subscribing. The blank page's own idle event carries a stale
/// loader id and is ignored.
async fn wait_for_network_idle(
    mut events: EventStream<EventLifecycleEvent>,
    main_frame: Option<&FrameId>,
    url: &Url,
) -> Result<()> {
    let mut loader: Option<LoaderId> = None;
    while let Some(event) = events.next().await {
        if main_frame.is_some_and(|frame| *frame != event.frame_id) {
            continue;
        }
        match event.name.as_str() {
            "init" => loader = Some(event.loader_id.clone()),
            "networkIdle" if loader.as_ref() == Some(&event.loader_id) => {
                debug!("Network idle on {}", url);
                return Ok(());
            }
            _ => {}
        }
    }
    Err(ScanError::render(
        url.as_str(),
        "lifecycle events ended before network idle",
    ))
}

#[async_trait]
impl FetchStrategy for RenderedFetcher {
    async fn open(&self) -> Result<()> {
        let mut slot = self.browser.write().await;
        if slot.is_some() {
            return Ok(());
        }

        let (browser, mut handler) = Browser::launch(self.launch_config()?)
            .await
            .map_err(|e| ScanError::render("browser launch", e))?;

        let task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        *slot = Some(browser);
        *self.handler.lock().await = Some(task);
        info!("Headless browser launched");
        Ok(())
    }

    async fn fetch(&self, url: &Url) -> Result<FetchedPage> {
        let guard = self.browser.read().await;
        let browser = guard
            .as_ref()
            .ok_or_else(|| ScanError::render(url.as_str(), "browser not open"))?;

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| ScanError::render(url.as_str(), e))?;

        let outcome = match timeout(self.options.timeout(), self.render(&page, url)).await {
            Ok(result) => result,
            Err(_) => Err(ScanError::render(
                url.as_str(),
                format!("timed out after {:?}", self.options.timeout()),
            )),
        };

        if let Err(e) = page.close().await {
            warn!("Failed to close page for {}: {} (non-fatal)", url, e);
        }
        outcome
    }

    async fn close(&self) -> Result<()> {
        if let Some(mut browser) = self.browser.write().await.take() {
            if let Err(e) = browser.close().await {
                warn!("Failed to close browser: {}", e);
            }
            if let Err(e) = browser.wait().await {
                warn!("Browser process did not exit cleanly: {}", e);
            }
        }
        if let Some(task) = self.handler.lock().await.take() {
            task.abort();
        }
        info!("Browser closed and resources released");
        Ok(())
    }

    fn rendered(&self) -> bool {
        true
    }
}
