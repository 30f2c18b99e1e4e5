//! Embedded `application/ld+json` structured data.

use anyhow::anyhow;
use scraper::{Html, Selector};
use serde_json::Value;

const SCRIPT_SELECTOR: &str = r#"script[type="application/ld+json"]"#;

/// Finds the first JSON-LD entity of a given `@type` in a document.
#[derive(Debug, Clone)]
pub struct JsonLdExtractor {
    scripts: Selector,
    entity_type: String,
}

impl JsonLdExtractor {
    pub fn new(entity_type: &str) -> anyhow::Result<Self> {
        let scripts = Selector::parse(SCRIPT_SELECTOR)
            .map_err(|e| anyhow!("Invalid selector {SCRIPT_SELECTOR}: {e}"))?;
        Ok(Self {
            scripts,
            entity_type: entity_type.to_string(),
        })
    }

    /// Raw text of every JSON-LD block, in document order.
    pub fn blocks(&self, doc: &Html) -> Vec<String> {
        doc.select(&self.scripts)
            .map(|script| script.text().collect::<String>())
            .collect()
    }

    /// Every entry of every parsable block.
    ///
    /// A top-level array is flattened and `@graph` members are appended after their container.
    pub fn entries(&self, doc: &Html) -> Vec<Value> {
        let mut entries = Vec::new();

        for block in self.blocks(doc) {
            let value: Value = match serde_json::from_str(block.trim()) {
                Ok(value) => value,
                Err(e) => {
                    log::debug!("Skipping invalid JSON-LD block: {e}");
                    continue;
                }
            };

            let top = match value {
                Value::Array(items) => items,
                other => vec![other],
            };
            for entry in top {
                let graph = match entry.get("@graph") {
                    Some(Value::Array(graph)) => graph.clone(),
                    _ => Vec::new(),
                };
                entries.push(entry);
                entries.extend(graph);
            }
        }

        entries
    }

    pub fn find(&self, doc: &Html) -> Option<Value> {
        self.entries(doc)
            .into_iter()
            .find(|entry| has_type(entry, &self.entity_type))
    }
}

/// Whether `@type`, a string or an array of strings, names `ty`.
///
/// Matching ignores ASCII case and a `schema:` or `https://schema.org/` prefix.
pub fn has_type(entry: &Value, ty: &str) -> bool {
    let matches = |s: &str| {
        s.rsplit(|c| c == '/' || c == ':')
            .next()
            .is_some_and(|s| s.eq_ignore_ascii_case(ty))
    };
    match entry.get("@type") {
        Some(Value::String(s)) => matches(s.as_str()),
        Some(Value::Array(types)) => types.iter().filter_map(Value::as_str).any(matches),
        _ => false,
    }
}

/// Flattens a JSON-LD property to a single cell of text.
pub fn text_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.trim())
            .filter(|s| !s.is_empty())
            .map(str::to_string),
        Value::Array(items) => {
            let parts = items.iter().filter_map(text_value).collect::<Vec<_>>();
            (!parts.is_empty()).then(|| parts.join("; "))
        }
        Value::Object(map) => map.get("name").and_then(text_value),
    }
}
