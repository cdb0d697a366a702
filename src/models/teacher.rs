use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Teacher {
    pub id: i64,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone_number: String,
    #[serde(default)]
    pub specializations: Vec<String>,
}

impl Teacher {
    pub fn matches_search(&self, query: &str) -> bool {
        super::matches_any(
            query,
            [self.name.as_str(), self.email.as_str()]
                .into_iter()
                .chain(self.specializations.iter().map(String::as_str)),
        )
    }

    pub fn specializations_label(&self) -> String {
        if self.specializations.is_empty() {
            "-".to_string()
        } else {
            self.specializations.join(", ")
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeacherPayload {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone_number: String,
    #[serde(default)]
    pub specializations: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

/// Splits a comma separated form field into trimmed, non-empty entries
pub fn split_specializations(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_specializations() {
        assert_eq!(
            split_specializations(" English, French ,,Business English "),
            vec!["English", "French", "Business English"]
        );
        assert!(split_specializations("  ").is_empty());
    }
}
