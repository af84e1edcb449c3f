/// One element-location strategy. Sessions carry an ordered list of these and
/// try them in turn, so a site revision that breaks the structural selector
/// only needs a new strategy, not new control flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    /// CSS selector (comma lists allowed); first match wins.
    Css(String),
    /// n-th match of a CSS selector, for repeated controls such as paired
    /// password fields or per-digit code boxes.
    Nth { css: String, index: usize },
    /// Case-insensitive text-content search across interactive elements
    /// (buttons, role=button links/divs, submit inputs).
    Text { labels: Vec<String> },
}

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Locator::Css(selector.into())
    }

    pub fn nth(selector: impl Into<String>, index: usize) -> Self {
        Locator::Nth {
            css: selector.into(),
            index,
        }
    }

    pub fn text<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Locator::Text {
            labels: labels.into_iter().map(Into::into).collect(),
        }
    }

    /// Human-readable form for logs and `ElementNotFound` details.
    pub fn describe(&self) -> String {
        match self {
            Locator::Css(css) => format!("css({})", css),
            Locator::Nth { css, index } => format!("css({})[{}]", css, index),
            Locator::Text { labels } => format!("text({})", labels.join("|")),
        }
    }
}
