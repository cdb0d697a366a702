use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::amount::Amount;

/// Subscription plan: a purchasable bundle of lessons
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub number_of_lessons: i64,
    pub price: Amount,
}

impl Plan {
    pub fn matches_search(&self, query: &str) -> bool {
        super::matches_any(query, [self.name.as_str(), self.description.as_str()])
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PlanPayload {
    pub name: String,
    pub description: String,
    pub number_of_lessons: i64,
    pub price: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentSubscription {
    pub id: i64,
    pub student: i64,
    pub subscription_plan: i64,
    pub start_date: NaiveDate,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionPayload {
    pub student: i64,
    pub subscription_plan: i64,
    pub start_date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
}
