use askama::Template;
use axum::{routing::get, Router};

use crate::api::layout::{Layout, Nav, PageContext};
use crate::api::middleware::session::AppState;
use crate::api::students::{subscription_rows, SubscriptionRow};
use crate::error::{recoverable, AppError};
use crate::models::Student;
use crate::services::backend;
use crate::services::qr_generator;

/// The signed-in student's own record with their attendance code
pub struct PortalCard {
    pub student: Student,
    pub qr_svg: String,
    pub subscriptions: Vec<SubscriptionRow>,
}

#[derive(Template)]
#[template(path = "portal.html")]
struct PortalTemplate {
    layout: Layout,
    card: Option<PortalCard>,
    problem: Option<String>,
}

async fn portal_page(page: PageContext) -> Result<PortalTemplate, AppError> {
    // Student records share their id with the login account
    let student_id = page.user.user_id;

    let loaded = tokio::try_join!(
        backend::students::get_student(&page.api, student_id),
        backend::plans::list_subscriptions(&page.api, student_id),
        backend::plans::list_plans(&page.api),
    );

    let (card, problem) = match loaded {
        Ok((student, subscriptions, plans)) => {
            let qr_svg = qr_generator::student_qr_svg(&student)?;
            let card = PortalCard {
                subscriptions: subscription_rows(subscriptions, &plans),
                student,
                qr_svg,
            };
            (Some(card), None)
        }
        Err(e) => {
            let e = recoverable(e)?;
            tracing::warn!(user_id = student_id, error = %e, "Student portal unavailable");
            let problem = if e.is_not_found() {
                "No student record is linked to this account yet. Please contact the school office."
                    .to_string()
            } else {
                e.user_message()
            };
            (None, Some(problem))
        }
    };

    Ok(PortalTemplate {
        layout: page.layout(Nav::Portal).await?,
        card,
        problem,
    })
}

pub fn router() -> Router<AppState> {
    Router::new().route("/portal", get(portal_page))
}
