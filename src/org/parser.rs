use regex::Regex;
use std::sync::LazyLock;

// The whole headline is the title; a trailing `:word:` is marker text, not tags.
static HEADLINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<stars>\*+)\s+(?P<title>.+?)\s*$").unwrap()
});

static PROPERTY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*:(?P<key>[A-Z_]+):\s+(?P<value>.+)$").unwrap()
});

pub struct OrgParser;

/// A parsed org heading with its properties drawer.
#[derive(Debug, Clone)]
pub struct ParsedHeading {
    pub level: usize,
    pub title: String,
    pub properties: Vec<(String, String)>,
}

impl OrgParser {
    /// Parse an org file string into a list of headings. Body text between
    /// headings is skipped.
    pub fn parse(input: &str) -> Vec<ParsedHeading> {
        let lines: Vec<&str> = input.lines().collect();
        let mut headings = Vec::new();
        let mut i = 0;

        while i < lines.len() {
            if let Some(captures) = HEADLINE_RE.captures(lines[i]) {
                let level = captures
                    .name("stars")
                    .map(|m| m.as_str().len())
                    .unwrap_or(1);
                let title = captures["title"].to_string();

                i += 1;

                // Parse properties drawer
                let mut properties = Vec::new();
                if i < lines.len() && lines[i].trim() == ":PROPERTIES:" {
                    i += 1;
                    while i < lines.len() && lines[i].trim() != ":END:" {
                        if let Some(caps) = PROPERTY_RE.captures(lines[i]) {
                            let value = caps["value"].trim().to_string();
                            properties.push((caps["key"].to_string(), value));
                        }
                        i += 1;
                    }
                    if i < lines.len() {
                        i += 1; // skip :END:
                    }
                }

                headings.push(ParsedHeading {
                    level,
                    title,
                    properties,
                });
            } else {
                i += 1;
            }
        }

        headings
    }

    /// Extract a property value by key.
    pub fn get_property<'a>(props: &'a [(String, String)], key: &str) -> Option<&'a str> {
        props
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}
