use crate::error::{BrowserError, Result};

/// Browser actions for automation
#[async_trait::async_trait]
pub trait BrowserActions: Send + Sync {
    /// Navigate to a URL
    async fn navigate(&self, url: &str) -> Result<()>;

    /// Replace the value of a form field by selector
    async fn fill_field(&self, selector: &str, value: &str) -> Result<()>;

    /// Click an element by selector
    async fn click(&self, selector: &str) -> Result<()>;

    /// Wait for a selector to appear
    async fn wait_for_selector(&self, selector: &str, timeout_ms: u64) -> Result<()>;

    /// Extract text from an element
    async fn extract_text(&self, selector: &str) -> Result<String>;

    /// Whether an element exists and occupies space on screen
    async fn is_visible(&self, selector: &str) -> Result<bool>;

    /// URL of the current document
    async fn current_url(&self) -> Result<String>;

    /// Evaluate a script and return its JSON result (`null` for undefined)
    async fn evaluate(&self, script: &str) -> Result<serde_json::Value>;

    /// Release the page and whatever isolates it
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// Helper to extract domain from URL
pub fn extract_domain(url: &str) -> Result<String> {
    let url = url::Url::parse(url)
        .map_err(|e| BrowserError::NavigationError(format!("Invalid URL: {e}")))?;

    url.host_str()
        .ok_or_else(|| BrowserError::NavigationError("No host in URL".to_string()))
        .map(ToString::to_string)
}

/// Quote a string as a JavaScript literal.
pub fn js_string(value: &str) -> String {
    serde_json::Value::String(value.to_owned()).to_string()
}

/// Script reporting whether `selector` matches a rendered, visible element.
pub fn visibility_script(selector: &str) -> String {
    format!(
        "(() => {{ const el = document.querySelector({sel}); \
         if (!el) return false; \
         const r = el.getBoundingClientRect(); \
         const s = window.getComputedStyle(el); \
         return r.width > 0 && r.height > 0 && s.visibility !== 'hidden' && s.display !== 'none'; }})()",
        sel = js_string(selector)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_domain() {
        assert_eq!(
            extract_domain("https://example.com/path").unwrap(),
            "example.com"
        );
        assert_eq!(
            extract_domain("http://subdomain.example.com:8080/path").unwrap(),
            "subdomain.example.com"
        );
    }

    #[test]
    fn test_extract_domain_invalid() {
        assert!(extract_domain("not-a-url").is_err());
    }

    #[test]
    fn test_js_string_escapes() {
        assert_eq!(js_string("a[name='x']"), r#""a[name='x']""#);
        assert_eq!(js_string(r#"say "hi""#), r#""say \"hi\"""#);
    }

    #[test]
    fn test_visibility_script_embeds_selector() {
        let script = visibility_script("#login");
        assert!(script.contains(r##"document.querySelector("#login")"##));
    }
}
