use serde::{Deserialize, Serialize};

use super::amount::Amount;

/// Compact student view embedded in a parent record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChildSummary {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub level: String,
    #[serde(default)]
    pub lessons_remaining: i64,
    #[serde(default)]
    pub subscription_balance: Amount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parent {
    pub id: i64,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone_number: String,
    #[serde(default)]
    pub children: Vec<ChildSummary>,
    #[serde(default)]
    pub total_lessons_remaining: Option<i64>,
    #[serde(default)]
    pub total_subscription_balance: Option<Amount>,
}

impl Parent {
    /// Matches the parent's name or email, or any linked child's name
    pub fn matches_search(&self, query: &str) -> bool {
        super::matches_any(
            query,
            [self.name.as_str(), self.email.as_str()]
                .into_iter()
                .chain(self.children.iter().map(|c| c.name.as_str())),
        )
    }

    pub fn children_label(&self) -> String {
        if self.children.is_empty() {
            "No children linked".to_string()
        } else {
            self.children
                .iter()
                .map(|c| c.name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ParentPayload {
    pub name: String,
    pub email: String,
    pub phone_number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ParentStudentLinkPayload {
    pub parent: i64,
    pub student: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ParentStudentLink {
    pub id: i64,
    pub parent: i64,
    pub student: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parent_totals_come_from_backend() {
        let parent: Parent = serde_json::from_str(
            r#"{
                "id": 5,
                "name": "Maria Lopez",
                "email": "maria@home.test",
                "children": [
                    {"id": 1, "name": "Ana", "lessons_remaining": 3, "subscription_balance": "30.00"},
                    {"id": 2, "name": "Luis", "lessons_remaining": 5, "subscription_balance": 50}
                ],
                "total_lessons_remaining": 8,
                "total_subscription_balance": "80.00"
            }"#,
        )
        .unwrap();

        assert_eq!(parent.children_label(), "Ana, Luis");
        assert_eq!(parent.total_lessons_remaining, Some(8));
        assert_eq!(parent.children[1].subscription_balance.as_str(), "50");

        assert!(parent.matches_search("luis"));
        assert!(parent.matches_search("HOME.test"));
        assert!(!parent.matches_search("pedro"));
    }
}
