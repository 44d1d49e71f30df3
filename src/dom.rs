use crate::{ConnectorError, Result};
use scraper::{ElementRef, Html, Selector};
use tracing::instrument;

/// The `Document` struct wraps a parsed HTML page and answers CSS-selector queries against it.
/// It is what an HTML-parsing client hands back instead of the raw body.
#[derive(Debug)]
pub struct Document {
    /// The parsed HTML tree.
    html: Html,
}

impl Document {
    /// Parses a full HTML document.
    ///
    /// # Arguments
    ///
    /// * `html` - The HTML string to be parsed.
    ///
    /// # Returns
    ///
    /// A new `Document`. Parsing is lenient and never fails.
    #[instrument(skip(html), fields(html_length = html.len()))]
    pub fn parse(html: &str) -> Self {
        Self {
            html: Html::parse_document(html),
        }
    }

    /// The underlying `scraper` tree, for queries this type does not cover.
    pub fn html(&self) -> &Html {
        &self.html
    }

    /// Returns the cleaned text of every element matching `css`, skipping blank matches.
    ///
    /// # Arguments
    ///
    /// * `css` - The CSS selector.
    ///
    /// # Returns
    ///
    /// A `Result` with the texts in document order, or an error if the selector is invalid.
    pub fn select_text(&self, css: &str) -> Result<Vec<String>> {
        let selector = parse_selector(css)?;

        Ok(self
            .html
            .select(&selector)
            .map(element_text)
            .filter(|text| !text.is_empty())
            .collect())
    }

    /// Returns the cleaned text of the first non-blank match.
    pub fn first_text(&self, css: &str) -> Result<Option<String>> {
        Ok(self.select_text(css)?.into_iter().next())
    }

    /// Returns the value of attribute `name` on every element matching `css` that carries it.
    pub fn attr(&self, css: &str, name: &str) -> Result<Vec<String>> {
        let selector = parse_selector(css)?;

        Ok(self
            .html
            .select(&selector)
            .filter_map(|element| element.value().attr(name))
            .map(str::to_string)
            .collect())
    }

    /// Looks up page metadata by name.
    ///
    /// `<meta name=...>` tags win through their `content` attribute; the `<title>` element is
    /// consulted for `"title"` when no meta tag exists.
    pub fn meta(&self, name: &str) -> Option<String> {
        let quoted = css_string(name);
        let css = format!("meta[name={quoted}], meta[property={quoted}]");
        let selector = Selector::parse(&css).ok()?;

        if let Some(content) = self
            .html
            .select(&selector)
            .find_map(|element| element.value().attr("content"))
        {
            return Some(content.trim().to_string());
        }

        if name == "title" {
            let title = Selector::parse("title").ok()?;
            return self
                .html
                .select(&title)
                .map(element_text)
                .find(|text| !text.is_empty());
        }

        None
    }
}

/// Quotes `value` as a CSS string literal.
fn css_string(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('\'', "\\'");
    format!("'{escaped}'")
}

fn parse_selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| ConnectorError::InvalidSelector(format!("{css}: {e}")))
}

/// Joins an element's text nodes and normalizes whitespace.
fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
