//! Target discovery: which pages a run has to visit.

use crate::actions::{js_string, BrowserActions};
use crate::error::{BrowserError, Result};
use async_trait::async_trait;
use varia_core::{Category, Locator};

/// Lists the target pages of one category.
#[async_trait]
pub trait TargetDiscovery: Send + Sync {
    async fn discover(&self, category: Category) -> Result<Vec<Locator>>;

    /// Release whatever discovery browsed with. Called once targets are known.
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// A fixed list of targets from configuration.
#[derive(Debug)]
pub struct StaticTargets(pub Vec<Locator>);

#[async_trait]
impl TargetDiscovery for StaticTargets {
    async fn discover(&self, _category: Category) -> Result<Vec<Locator>> {
        Ok(self.0.clone())
    }
}

/// Collects target links from the category's index page.
pub struct LinkDiscovery<A> {
    page: A,
    index_url: String,
    link_selector: String,
}

impl<A: BrowserActions> LinkDiscovery<A> {
    pub fn new(page: A, index_url: impl Into<String>, link_selector: impl Into<String>) -> Self {
        Self {
            page,
            index_url: index_url.into(),
            link_selector: link_selector.into(),
        }
    }

    /// The wrapped page.
    pub fn page(&self) -> &A {
        &self.page
    }
}

/// Valid, first-seen-order unique locators among `hrefs`.
fn unique_locators(hrefs: Vec<String>) -> Vec<Locator> {
    let mut seen = std::collections::HashSet::new();
    let mut locators = Vec::new();
    for href in hrefs {
        let href = href.split('#').next().unwrap_or_default().to_string();
        if !seen.insert(href.clone()) {
            continue;
        }
        match Locator::new(href) {
            Ok(locator) => locators.push(locator),
            Err(e) => tracing::debug!("Ignoring link: {}", e),
        }
    }
    locators
}

#[async_trait]
impl<A: BrowserActions + 'static> TargetDiscovery for LinkDiscovery<A> {
    async fn discover(&self, category: Category) -> Result<Vec<Locator>> {
        self.page.navigate(&self.index_url).await?;

        let script = format!(
            "Array.from(document.querySelectorAll({})).map(a => a.href)",
            js_string(&self.link_selector)
        );
        let hrefs: Vec<String> = serde_json::from_value(self.page.evaluate(&script).await?)
            .map_err(|e| BrowserError::Script(e.to_string()))?;

        let locators = unique_locators(hrefs);
        if locators.is_empty() {
            return Err(BrowserError::SelectorNotFound(self.link_selector.clone()));
        }

        tracing::info!("Discovered {} {} targets", locators.len(), category);
        Ok(locators)
    }

    async fn close(&self) -> Result<()> {
        self.page.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_locators_dedupes_and_filters() {
        let hrefs = vec![
            "https://example.com/ui/marketing/sections/heroes".to_string(),
            "https://example.com/ui/marketing/sections/heroes#preview".to_string(),
            "https://example.com/pricing".to_string(),
            "https://example.com/ui/marketing/sections/footers".to_string(),
        ];
        let locators = unique_locators(hrefs);
        let urls: Vec<_> = locators.iter().map(Locator::as_str).collect();
        assert_eq!(
            urls,
            vec![
                "https://example.com/ui/marketing/sections/heroes",
                "https://example.com/ui/marketing/sections/footers",
            ]
        );
    }

    #[tokio::test]
    async fn test_static_targets() {
        let targets = StaticTargets(vec![Locator::new("https://example.com/a/b/c").unwrap()]);
        let found = targets.discover(Category::Marketing).await.unwrap();
        assert_eq!(found.len(), 1);
    }
}
