use crate::browser::config::{ConnectionOptions, LaunchOptions};
use crate::conversation::Provider;
use crate::error::{ChatTreeError, Result};
use crate::view::PageHandles;
use headless_chrome::{Browser, Tab};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::{ffi::OsStr, time::Duration};

/// A Chrome/Chromium instance holding the chat tab.
///
/// Page handles are created once per tab, so every view on a tab shares its
/// input channel and action queue.
pub struct BrowserSession {
    browser: Browser,
    handles: Mutex<HashMap<String, PageHandles>>,
}

impl BrowserSession {
    /// Launch a new browser instance with the given options
    pub fn launch(options: LaunchOptions) -> Result<Self> {
        let mut launch_opts = headless_chrome::LaunchOptions::default();

        // Chat hosts refuse automation-flagged browsers
        launch_opts.ignore_default_args.push(OsStr::new("--enable-automation"));
        launch_opts.args.push(OsStr::new("--disable-blink-features=AutomationControlled"));

        // Navigation runs can take minutes; the default 30s idle timeout would end the session
        launch_opts.idle_browser_timeout = Duration::from_secs(60 * 60);

        launch_opts.headless = options.headless;
        launch_opts.window_size = Some((options.window_width, options.window_height));

        if let Some(path) = options.chrome_path {
            launch_opts.path = Some(path);
        }

        if let Some(dir) = options.user_data_dir {
            launch_opts.user_data_dir = Some(dir);
        }

        launch_opts.sandbox = options.sandbox;

        let browser = Browser::new(launch_opts).map_err(|e| ChatTreeError::LaunchFailed(e.to_string()))?;

        browser.new_tab().map_err(|e| ChatTreeError::LaunchFailed(format!("Failed to create tab: {}", e)))?;

        Ok(Self::with_browser(browser))
    }

    /// Connect to an existing browser instance via WebSocket
    pub fn connect(options: ConnectionOptions) -> Result<Self> {
        let browser = Browser::connect_with_timeout(options.ws_url, Duration::from_millis(options.timeout))
            .map_err(|e| ChatTreeError::ConnectionFailed(e.to_string()))?;

        Ok(Self::with_browser(browser))
    }

    fn with_browser(browser: Browser) -> Self {
        Self { browser, handles: Mutex::new(HashMap::new()) }
    }

    /// Get all tabs
    pub fn get_tabs(&self) -> Result<Vec<Arc<Tab>>> {
        let tabs = self
            .browser
            .get_tabs()
            .lock()
            .map_err(|e| ChatTreeError::TabOperationFailed(format!("Failed to get tabs: {}", e)))?
            .clone();

        Ok(tabs)
    }

    /// Get the currently active tab by checking the document visibility and focus state
    pub fn get_active_tab(&self) -> Result<Arc<Tab>> {
        let tabs = self.get_tabs()?;

        // Visible and focused is the strongest signal, visible alone the fallback
        for probe in ["document.visibilityState === 'visible' && document.hasFocus()", "document.visibilityState === 'visible'"] {
            for tab in &tabs {
                match tab.evaluate(probe, false) {
                    Ok(remote_object) => {
                        if remote_object.value.and_then(|v| v.as_bool()).unwrap_or(false) {
                            return Ok(tab.clone());
                        }
                    }
                    Err(e) => {
                        log::debug!("Failed to check tab status: {}", e);
                    }
                }
            }
        }

        Err(ChatTreeError::TabOperationFailed("No active tab found".to_string()))
    }

    /// The first tab showing a supported chat host, with its provider.
    /// `prefer` narrows the search to one provider.
    pub fn chat_tab(&self, prefer: Option<Provider>) -> Result<(Arc<Tab>, Provider)> {
        for tab in self.get_tabs()? {
            if let Some(provider) = Provider::from_url(&tab.get_url()) {
                if prefer.is_none_or(|p| p == provider) {
                    log::debug!("Using {} tab {}", provider.as_str(), tab.get_url());
                    return Ok((tab, provider));
                }
            }
        }
        Err(ChatTreeError::TabOperationFailed("No chat tab open".to_string()))
    }

    /// Page handles for the chat tab, shared with earlier callers on the same tab
    pub fn page_handles(&self, prefer: Option<Provider>) -> Result<(PageHandles, Provider)> {
        let (tab, provider) = self.chat_tab(prefer)?;
        let mut handles = self
            .handles
            .lock()
            .map_err(|e| ChatTreeError::TabOperationFailed(format!("Failed to lock page handles: {}", e)))?;
        let pages = handles.entry(tab.get_target_id().to_string()).or_insert_with(|| PageHandles::chrome(tab)).clone();
        Ok((pages, provider))
    }

    /// Navigate the active tab to a URL and wait for it to load
    pub fn navigate(&self, url: &str) -> Result<Arc<Tab>> {
        let tab = self.get_active_tab().or_else(|_| {
            self.browser.new_tab().map_err(|e| ChatTreeError::TabOperationFailed(format!("Failed to create tab: {}", e)))
        })?;

        tab.navigate_to(url)
            .map_err(|e| ChatTreeError::TabOperationFailed(format!("Failed to navigate to {}: {}", url, e)))?;
        tab.wait_until_navigated()
            .map_err(|e| ChatTreeError::TabOperationFailed(format!("Navigation timeout: {}", e)))?;

        Ok(tab)
    }
}
