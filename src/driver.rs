use async_trait::async_trait;

/// The first five are the interaction failures the site is known to produce;
/// the controller branches on each of them. `Unclassified` is surfaced as-is.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DriverError {
    #[error("element not found: {selector}")]
    ElementNotFound { selector: String },
    #[error("element not interactable: {0}")]
    NotInteractable(String),
    #[error("click intercepted: {0}")]
    ClickIntercepted(String),
    #[error("stale element reference: {0}")]
    StaleReference(String),
    #[error("element not visible: {0}")]
    NotVisible(String),
    #[error("browser error: {0}")]
    Unclassified(String),
}

impl DriverError {
    pub fn not_found(selector: impl Into<String>) -> Self {
        Self::ElementNotFound {
            selector: selector.into(),
        }
    }

    /// Pop-ups, reflows and half-rendered controls: worth a reload or a restart.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::NotInteractable(_)
                | Self::ClickIntercepted(_)
                | Self::StaleReference(_)
                | Self::NotVisible(_)
        )
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::ElementNotFound { .. } => "element_not_found",
            Self::NotInteractable(_) => "not_interactable",
            Self::ClickIntercepted(_) => "click_intercepted",
            Self::StaleReference(_) => "stale_reference",
            Self::NotVisible(_) => "not_visible",
            Self::Unclassified(_) => "unclassified",
        }
    }
}

#[async_trait]
pub trait BrowserDriver: Send {
    type Element: Send + Sync;

    async fn navigate(&mut self, url: &str) -> Result<(), DriverError>;

    async fn current_markup(&mut self) -> Result<String, DriverError>;

    async fn find(&mut self, selector: &str) -> Result<Self::Element, DriverError>;

    async fn click(&mut self, element: &Self::Element) -> Result<(), DriverError>;

    async fn scroll_to_bottom(&mut self) -> Result<(), DriverError>;

    async fn execute_script(&mut self, script: &str) -> Result<serde_json::Value, DriverError>;
}
