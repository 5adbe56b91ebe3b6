use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Context as _;
use async_trait::async_trait;
use chromiumoxide::error::CdpError;
use chromiumoxide::{Browser, BrowserConfig, Element, Handler, Page};
use futures::StreamExt as _;
use tokio::task::JoinHandle;

use crate::config::ChromeOptions;
use crate::driver::{BrowserDriver, DriverError};

const CHROME_PATHS: &[&str] = &[
    "/usr/bin/google-chrome",
    "/usr/bin/google-chrome-stable",
    "/usr/bin/chromium",
    "/usr/bin/chromium-browser",
    "/snap/bin/chromium",
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
    "/opt/google/chrome/google-chrome",
];

const CHROME_COMMANDS: &[&str] = &[
    "google-chrome",
    "google-chrome-stable",
    "chromium",
    "chromium-browser",
];

const FIND_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Checks the element the way a user would see it, then scrolls it to the
/// viewport centre and hit-tests that point.
const CLICK_PREFLIGHT: &str = r#"
function() {
    if (!this.isConnected) {
        return 'stale';
    }
    const style = window.getComputedStyle(this);
    const rect = this.getBoundingClientRect();
    if (rect.width === 0 || rect.height === 0 || style.visibility === 'hidden' || style.display === 'none') {
        return 'hidden';
    }
    if (this.disabled || style.pointerEvents === 'none') {
        return 'disabled';
    }
    this.scrollIntoView({ block: 'center', inline: 'center' });
    const box = this.getBoundingClientRect();
    const hit = document.elementFromPoint(box.left + box.width / 2, box.top + box.height / 2);
    if (hit && hit !== this && !this.contains(hit)) {
        return 'intercepted:' + (hit.id || hit.className || hit.tagName);
    }
    return 'ok';
}
"#;

pub struct ChromeDriver {
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
    implicit_wait: Duration,
    launched: bool,
}

impl ChromeDriver {
    pub async fn start(options: &ChromeOptions) -> anyhow::Result<Self> {
        let (browser, handler, launched) = match options.remote_url.as_deref() {
            Some(remote_url) => {
                let (browser, handler) = connect_remote(remote_url).await?;
                (browser, handler, false)
            }
            None => {
                let (browser, handler) = launch(options).await?;
                (browser, handler, true)
            }
        };

        let handler = spawn_handler(handler);
        let page = browser
            .new_page("about:blank")
            .await
            .context("open browser tab")?;

        Ok(Self {
            browser,
            page,
            handler,
            implicit_wait: options.implicit_wait,
            launched,
        })
    }

    pub async fn quit(mut self) -> anyhow::Result<()> {
        if let Err(err) = self.page.clone().close().await {
            tracing::debug!(?err, "close tab");
        }
        if self.launched {
            self.browser.close().await.context("close browser")?;
            if let Err(err) = self.browser.wait().await {
                tracing::debug!(?err, "wait for browser exit");
            }
        }
        self.handler.abort();
        Ok(())
    }
}

#[async_trait]
impl BrowserDriver for ChromeDriver {
    type Element = Element;

    async fn navigate(&mut self, url: &str) -> Result<(), DriverError> {
        tracing::debug!(url, "navigate");
        self.page
            .goto(url)
            .await
            .map_err(|err| classify(err, url))?;
        Ok(())
    }

    async fn current_markup(&mut self) -> Result<String, DriverError> {
        self.page
            .content()
            .await
            .map_err(|err| classify(err, "page content"))
    }

    async fn find(&mut self, selector: &str) -> Result<Element, DriverError> {
        let deadline = Instant::now() + self.implicit_wait;
        loop {
            let mut found = self
                .page
                .find_elements(selector)
                .await
                .map_err(|err| classify(err, selector))?;
            if !found.is_empty() {
                return Ok(found.swap_remove(0));
            }
            if Instant::now() >= deadline {
                return Err(DriverError::not_found(selector));
            }
            tokio::time::sleep(FIND_POLL_INTERVAL).await;
        }
    }

    async fn click(&mut self, element: &Element) -> Result<(), DriverError> {
        let preflight = element
            .call_js_fn(CLICK_PREFLIGHT, false)
            .await
            .map_err(|err| classify(err, "click preflight"))?;
        let verdict = preflight
            .result
            .value
            .as_ref()
            .and_then(|value| value.as_str())
            .unwrap_or("ok")
            .to_owned();

        match verdict.as_str() {
            "ok" => {}
            "stale" => return Err(DriverError::StaleReference("element detached".to_owned())),
            "hidden" => return Err(DriverError::NotVisible("element has no visible box".to_owned())),
            "disabled" => {
                return Err(DriverError::NotInteractable(
                    "element is disabled".to_owned(),
                ));
            }
            other => {
                let blocker = other.strip_prefix("intercepted:").unwrap_or(other);
                return Err(DriverError::ClickIntercepted(format!(
                    "click would land on {blocker}"
                )));
            }
        }

        element
            .click()
            .await
            .map_err(|err| classify(err, "click"))?;
        Ok(())
    }

    async fn scroll_to_bottom(&mut self) -> Result<(), DriverError> {
        self.page
            .evaluate("window.scrollTo(0, document.body.scrollHeight);")
            .await
            .map_err(|err| classify(err, "scroll"))?;
        Ok(())
    }

    /// Runs `script` as a function body, so `return` works as it does in WebDriver.
    async fn execute_script(&mut self, script: &str) -> Result<serde_json::Value, DriverError> {
        let wrapped = format!("(() => {{ {script} }})()");
        let result = self
            .page
            .evaluate(wrapped)
            .await
            .map_err(|err| classify(err, "execute script"))?;
        Ok(result.value().cloned().unwrap_or(serde_json::Value::Null))
    }
}

async fn launch(options: &ChromeOptions) -> anyhow::Result<(Browser, Handler)> {
    let executable = match options.executable.clone() {
        Some(path) => path,
        None => find_chrome()?,
    };
    tracing::info!(
        executable = %executable.display(),
        headless = options.headless,
        "launching browser"
    );

    let (width, height) = options.window_size;
    let mut builder = BrowserConfig::builder()
        .chrome_executable(executable)
        .window_size(width, height)
        .arg("--no-sandbox")
        .arg("--disable-gpu")
        .arg("--disable-dev-shm-usage")
        .arg("--no-first-run")
        .arg("--no-default-browser-check");
    // with_head means NOT headless
    if !options.headless {
        builder = builder.with_head();
    }

    let config = builder
        .build()
        .map_err(|err| anyhow::anyhow!("build browser config: {err}"))?;
    Browser::launch(config).await.context("launch browser")
}

async fn connect_remote(remote_url: &str) -> anyhow::Result<(Browser, Handler)> {
    tracing::info!(remote_url, "connecting to remote browser");

    let http_url = remote_url
        .replace("ws://", "http://")
        .replace("wss://", "https://");
    let version_url = format!("{}/json/version", http_url.trim_end_matches('/'));

    let version: serde_json::Value = reqwest::Client::new()
        .get(&version_url)
        .send()
        .await
        .with_context(|| format!("GET {version_url}"))?
        .error_for_status()
        .with_context(|| format!("GET {version_url}"))?
        .json()
        .await
        .context("parse browser version info")?;

    let ws_url = version
        .get("webSocketDebuggerUrl")
        .and_then(|value| value.as_str())
        .ok_or_else(|| anyhow::anyhow!("no webSocketDebuggerUrl in {version_url}"))?;

    Browser::connect(ws_url)
        .await
        .with_context(|| format!("connect to {ws_url}"))
}

fn spawn_handler(mut handler: Handler) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = handler.next().await {
            if let Err(err) = event {
                tracing::debug!(?err, "browser handler stopped");
                break;
            }
        }
    })
}

fn find_chrome() -> anyhow::Result<PathBuf> {
    for path in CHROME_PATHS {
        let path = PathBuf::from(path);
        if path.exists() {
            return Ok(path);
        }
    }
    for command in CHROME_COMMANDS {
        if let Ok(path) = which::which(command) {
            return Ok(path);
        }
    }
    anyhow::bail!("Chrome/Chromium not found; install it or pass --chrome <path>")
}

fn classify(err: CdpError, what: &str) -> DriverError {
    match err {
        CdpError::NotFound => DriverError::not_found(what),
        CdpError::ScrollingFailed(message) => DriverError::NotVisible(format!("{what}: {message}")),
        other => {
            let message = other.to_string();
            if is_detached_node(&message) {
                DriverError::StaleReference(format!("{what}: {message}"))
            } else {
                DriverError::Unclassified(format!("{what}: {message}"))
            }
        }
    }
}

fn is_detached_node(message: &str) -> bool {
    let message = message.to_ascii_lowercase();
    ["could not find node", "no node with given id", "node is detached", "cannot find context"]
        .iter()
        .any(|needle| message.contains(needle))
}
