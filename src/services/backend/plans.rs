use super::{ApiError, ApiSession};
use crate::models::plan::{Plan, PlanPayload, StudentSubscription, SubscriptionPayload};

const PLANS: &str = "students/subscription-plans/";
const SUBSCRIPTIONS: &str = "students/student-subscriptions/";

fn detail(id: i64) -> String {
    format!("{}{}/", PLANS, id)
}

#[tracing::instrument(skip(api))]
pub async fn list_plans(api: &ApiSession) -> Result<Vec<Plan>, ApiError> {
    api.list(PLANS, &[]).await
}

#[tracing::instrument(skip(api))]
pub async fn get_plan(api: &ApiSession, id: i64) -> Result<Plan, ApiError> {
    api.get(&detail(id), &[]).await
}

#[tracing::instrument(skip(api, payload), fields(name = %payload.name))]
pub async fn create_plan(api: &ApiSession, payload: &PlanPayload) -> Result<Plan, ApiError> {
    api.post(PLANS, payload).await
}

#[tracing::instrument(skip(api, payload))]
pub async fn update_plan(api: &ApiSession, id: i64, payload: &PlanPayload) -> Result<Plan, ApiError> {
    api.patch(&detail(id), payload).await
}

#[tracing::instrument(skip(api))]
pub async fn delete_plan(api: &ApiSession, id: i64) -> Result<(), ApiError> {
    api.delete(&detail(id)).await
}

#[tracing::instrument(skip(api))]
pub async fn list_subscriptions(
    api: &ApiSession,
    student_id: i64,
) -> Result<Vec<StudentSubscription>, ApiError> {
    api.list(SUBSCRIPTIONS, &[("student_id", student_id.to_string())])
        .await
}

/// Assigns a plan to a student; the backend credits lessons and balance
#[tracing::instrument(skip(api, payload), fields(student_id = payload.student, plan_id = payload.subscription_plan))]
pub async fn create_subscription(
    api: &ApiSession,
    payload: &SubscriptionPayload,
) -> Result<StudentSubscription, ApiError> {
    api.post(SUBSCRIPTIONS, payload).await
}
