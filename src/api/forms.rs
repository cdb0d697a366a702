// HTML forms submit an untouched field as an empty string rather than
// leaving it out.

use std::str::FromStr;

use serde::Deserialize;

/// `?q=` of the searchable list pages
#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

impl SearchQuery {
    pub fn text(&self) -> String {
        non_blank(&self.q).unwrap_or_default()
    }
}

/// `None` for missing or whitespace-only values, trimmed text otherwise
pub fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Parses a non-blank value; blank or unparsable input gives `None`
pub fn parse_opt<T: FromStr>(value: &Option<String>) -> Option<T> {
    non_blank(value).and_then(|v| v.parse().ok())
}

/// HTML checkboxes submit "on" when ticked and nothing otherwise
pub fn checkbox(value: &Option<String>) -> bool {
    matches!(
        value.as_deref().map(str::trim),
        Some("on") | Some("true") | Some("1")
    )
}

/// Builds a query string from the non-empty pairs
pub fn query_string<'a>(pairs: impl IntoIterator<Item = (&'a str, String)>) -> String {
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (key, value) in pairs {
        if !value.is_empty() {
            serializer.append_pair(key, &value);
        }
    }
    serializer.finish()
}

/// Whether `path` stays on this site. Browsers read `//host` and `/\host`
/// as another origin.
pub fn is_local_path(path: &str) -> bool {
    let mut chars = path.chars();
    chars.next() == Some('/') && !matches!(chars.next(), Some('/') | Some('\\'))
}

/// Keeps redirect targets on this site
pub fn local_path(candidate: Option<&str>, fallback: &str) -> String {
    match candidate.map(str::trim) {
        Some(path) if is_local_path(path) => path.to_string(),
        _ => fallback.to_string(),
    }
}

/// Every value submitted under `key`, for multi-select checkboxes
pub fn all_values(body: &[u8], key: &str) -> Vec<String> {
    url::form_urlencoded::parse(body)
        .filter(|(k, _)| k == key)
        .map(|(_, v)| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_handling() {
        assert_eq!(non_blank(&Some("  ".to_string())), None);
        assert_eq!(non_blank(&Some(" a ".to_string())), Some("a".to_string()));
        assert_eq!(parse_opt::<i64>(&Some("12".to_string())), Some(12));
        assert_eq!(parse_opt::<i64>(&Some("x".to_string())), None);
        assert!(checkbox(&Some("on".to_string())));
        assert!(!checkbox(&None));
    }

    #[test]
    fn test_query_string_skips_empty() {
        assert_eq!(
            query_string([("status", "present".to_string()), ("q", String::new()), ("name", "Ana L".to_string())]),
            "status=present&name=Ana+L"
        );
    }

    #[test]
    fn test_local_path() {
        assert_eq!(local_path(Some("/attendance?page=2"), "/"), "/attendance?page=2");
        assert_eq!(local_path(Some("//evil.test"), "/"), "/");
        assert_eq!(local_path(Some("/\\evil.test/phish"), "/attendance"), "/attendance");
        assert_eq!(local_path(Some(" /\\evil.test"), "/"), "/");
        assert_eq!(local_path(Some("https://evil.test/"), "/"), "/");
        assert_eq!(local_path(None, "/students"), "/students");
    }

    #[test]
    fn test_all_values_keeps_repeated_keys() {
        let body = b"ids=3&ids=5&return_to=%2Fplans&ids=";
        assert_eq!(all_values(body, "ids"), vec!["3".to_string(), "5".to_string()]);
    }
}
