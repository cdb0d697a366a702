use serde::{Deserialize, Serialize};

use super::amount::Amount;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Student {
    pub id: i64,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone_number: String,
    #[serde(default)]
    pub level: String,
    #[serde(default)]
    pub lessons_remaining: i64,
    #[serde(default)]
    pub subscription_balance: Amount,
    #[serde(default)]
    pub qr_code: String,
}

impl Student {
    /// Text encoded into the student's attendance QR code.
    ///
    /// The backend stores the bare student id in `qr_code`; an empty value
    /// means no code was generated yet, in which case the id itself is used.
    pub fn qr_payload(&self) -> String {
        let stored = self.qr_code.trim();
        if stored.is_empty() {
            self.id.to_string()
        } else {
            stored.to_string()
        }
    }

    pub fn matches_search(&self, query: &str) -> bool {
        super::matches_any(query, [self.name.as_str(), self.email.as_str(), self.level.as_str()])
    }
}

/// Body for creating or updating a student
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentPayload {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone_number: String,
    #[serde(default)]
    pub level: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

/// Response of the reduce-lesson and scan endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct LessonReceipt {
    #[serde(default)]
    pub success: bool,
    #[serde(default, alias = "lessonsRemaining")]
    pub lessons_remaining: Option<i64>,
    #[serde(default, alias = "subscriptionBalance")]
    pub subscription_balance: Option<Amount>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Response of the refresh-qr endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct QrRefreshReceipt {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub qr_code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn student(qr_code: &str) -> Student {
        Student {
            id: 42,
            name: "Emma Watson".to_string(),
            email: "emma@school.test".to_string(),
            phone_number: String::new(),
            level: "Advanced".to_string(),
            lessons_remaining: 8,
            subscription_balance: Amount::new("80.00"),
            qr_code: qr_code.to_string(),
        }
    }

    #[test]
    fn test_qr_payload_falls_back_to_id() {
        assert_eq!(student("").qr_payload(), "42");
        assert_eq!(student(" 42 ").qr_payload(), "42");
    }

    #[test]
    fn test_matches_search() {
        let s = student("42");
        assert!(s.matches_search("emma"));
        assert!(s.matches_search("SCHOOL.TEST"));
        assert!(s.matches_search("advanced"));
        assert!(s.matches_search("  "));
        assert!(!s.matches_search("john"));
    }

    #[test]
    fn test_lesson_receipt_accepts_camel_case() {
        let receipt: LessonReceipt = serde_json::from_str(
            r#"{"success":true,"lessonsRemaining":4,"subscriptionBalance":"40.00","message":"ok"}"#,
        )
        .unwrap();
        assert!(receipt.success);
        assert_eq!(receipt.lessons_remaining, Some(4));
        assert_eq!(receipt.subscription_balance.unwrap().as_str(), "40.00");
    }
}
