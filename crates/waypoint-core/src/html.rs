//! Minimal HTML scraping for page titles and catalog links.
//!
//! Only what URL imports and reference catalog sync need: no DOM, just
//! tolerant pattern matching over the raw markup.

use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Url;

use crate::defaults::MAX_TITLE_LEN;
use crate::import::url_label;
use crate::models::Attachment;

static META_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<meta\b[^>]*>").expect("meta regex"));

static ATTR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)([a-z:_-]+)\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("attribute regex")
});

static TITLE_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title>").expect("title regex"));

static ANCHOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<a\b[^>]*?href\s*=\s*(?:"([^"]+)"|'([^']+)')[^>]*>(.*?)</a>"#)
        .expect("anchor regex")
});

static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]*>").expect("tag regex"));

static NUMERIC_ENTITY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"&#(x[0-9a-fA-F]+|[0-9]+);").expect("entity regex"));

/// File extensions that count as catalog documents.
pub const CATALOG_EXTENSIONS: &[&str] = &[
    "pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx", "zip", "csv", "json", "yaml", "yml",
];

fn attributes(tag: &str) -> Vec<(String, String)> {
    ATTR.captures_iter(tag)
        .map(|c| {
            let value = c.get(2).or_else(|| c.get(3)).map(|m| m.as_str()).unwrap_or("");
            (c[1].to_lowercase(), value.to_string())
        })
        .collect()
}

/// Decode the handful of entities that show up in titles.
pub fn decode_entities(text: &str) -> String {
    let numeric = NUMERIC_ENTITY.replace_all(text, |caps: &regex::Captures| {
        let raw = &caps[1];
        let code = match raw.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok(),
            None => raw.parse::<u32>().ok(),
        };
        code.and_then(char::from_u32)
            .map(|c| c.to_string())
            .unwrap_or_else(|| caps[0].to_string())
    });
    numeric
        .replace("&nbsp;", " ")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

fn clean_text(raw: &str) -> String {
    let stripped = TAG.replace_all(raw, " ");
    decode_entities(&stripped)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn truncate_title(title: String) -> String {
    if title.chars().count() <= MAX_TITLE_LEN {
        title
    } else {
        title.chars().take(MAX_TITLE_LEN).collect::<String>().trim_end().to_string()
    }
}

/// Page title: `og:title` when present, else `<title>`.
pub fn scrape_page_title(html: &str) -> Option<String> {
    let og = META_TAG.find_iter(html).find_map(|m| {
        let attrs = attributes(m.as_str());
        let is_og_title = attrs
            .iter()
            .any(|(k, v)| (k == "property" || k == "name") && v.eq_ignore_ascii_case("og:title"));
        if !is_og_title {
            return None;
        }
        attrs
            .into_iter()
            .find(|(k, _)| k == "content")
            .map(|(_, v)| clean_text(&v))
            .filter(|v| !v.is_empty())
    });

    og.or_else(|| {
        TITLE_TAG
            .captures(html)
            .map(|c| clean_text(&c[1]))
            .filter(|t| !t.is_empty())
    })
    .map(truncate_title)
}

/// Document links on a catalog index page, resolved against `base`.
///
/// Only links whose path ends in one of [`CATALOG_EXTENSIONS`] are kept;
/// duplicates (by resolved URL) are dropped.
pub fn extract_catalog_links(html: &str, base: &Url) -> Vec<Attachment> {
    let mut links: Vec<Attachment> = Vec::new();
    for caps in ANCHOR.captures_iter(html) {
        let Some(href) = caps.get(1).or_else(|| caps.get(2)) else {
            continue;
        };
        let href = decode_entities(href.as_str().trim());
        let Ok(url) = base.join(&href) else {
            continue;
        };
        if !matches!(url.scheme(), "http" | "https") {
            continue;
        }
        let is_document = url
            .path()
            .rsplit_once('.')
            .map(|(_, ext)| CATALOG_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
            .unwrap_or(false);
        if !is_document {
            continue;
        }

        let url = url.to_string();
        if links.iter().any(|l| l.url == url) {
            continue;
        }
        let text = clean_text(caps.get(3).map(|m| m.as_str()).unwrap_or(""));
        let name = if text.is_empty() { url_label(&url) } else { text };
        links.push(Attachment {
            name: truncate_title(name),
            url,
        });
    }
    links
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_og_title_preferred() {
        let html = r#"<html><head><title>Fallback</title>
            <meta content="Real &amp; Better" property="og:title"></head></html>"#;
        assert_eq!(scrape_page_title(html).as_deref(), Some("Real & Better"));
    }

    #[test]
    fn test_title_tag_fallback() {
        let html = "<HTML><head><TITLE>\n  Employee   Handbook &#8211; 2024 \n</TITLE></head>";
        assert_eq!(
            scrape_page_title(html).as_deref(),
            Some("Employee Handbook \u{2013} 2024")
        );
    }

    #[test]
    fn test_no_title() {
        assert_eq!(scrape_page_title("<p>nothing</p>"), None);
        assert_eq!(scrape_page_title("<title>   </title>"), None);
    }

    #[test]
    fn test_long_title_truncated() {
        let html = format!("<title>{}</title>", "x".repeat(MAX_TITLE_LEN + 50));
        assert_eq!(scrape_page_title(&html).unwrap().len(), MAX_TITLE_LEN);
    }

    #[test]
    fn test_decode_entities() {
        assert_eq!(decode_entities("a&nbsp;&lt;b&gt; &#39;c&#x27;"), "a <b> 'c'");
        assert_eq!(decode_entities("&amp;lt;"), "&lt;");
    }

    #[test]
    fn test_extract_catalog_links() {
        let base = Url::parse("https://catalog.example/specs/index.html").unwrap();
        let html = r#"
            <a href="api.pdf">API <b>Reference</b></a>
            <a href='/files/schema.yaml'>Schema</a>
            <a href="https://other.example/readme.html">Readme</a>
            <a href="mailto:x@example.com">Mail</a>
            <a href="api.pdf">Duplicate</a>
            <a href="data/export.CSV"></a>
        "#;
        let links = extract_catalog_links(html, &base);
        assert_eq!(
            links,
            vec![
                Attachment::new("API Reference", "https://catalog.example/specs/api.pdf"),
                Attachment::new("Schema", "https://catalog.example/files/schema.yaml"),
                Attachment::new("export.CSV", "https://catalog.example/specs/data/export.CSV"),
            ]
        );
    }
}
