use std::cmp::Ordering;

use askama::Template;
use axum::{
    body::Bytes,
    extract::{Path, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Router,
};
use serde::Deserialize;

use crate::api::forms::{all_values, non_blank, query_string};
use crate::api::layout::{Layout, Nav, PageContext};
use crate::api::middleware::session::AppState;
use crate::error::{recoverable, AppError};
use crate::models::plan::PlanPayload;
use crate::models::Plan;
use crate::services::backend;
use crate::services::feedback::Toast;
use crate::services::table::SortDirection;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanSort {
    Name,
    Lessons,
    Price,
}

impl PlanSort {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanSort::Name => "name",
            PlanSort::Lessons => "lessons",
            PlanSort::Price => "price",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "name" => Some(PlanSort::Name),
            "lessons" => Some(PlanSort::Lessons),
            "price" => Some(PlanSort::Price),
            _ => None,
        }
    }
}

fn price_key(plan: &Plan) -> f64 {
    plan.price.as_str().trim().parse().unwrap_or(f64::MAX)
}

pub fn sort_plans(plans: &mut [Plan], by: PlanSort, direction: SortDirection) {
    plans.sort_by(|a, b| {
        let ordering = match by {
            PlanSort::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
            PlanSort::Lessons => a.number_of_lessons.cmp(&b.number_of_lessons),
            PlanSort::Price => price_key(a)
                .partial_cmp(&price_key(b))
                .unwrap_or(Ordering::Equal),
        };
        match direction {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    });
}

#[derive(Debug, Default, Deserialize)]
pub struct PlanQuery {
    pub q: Option<String>,
    pub sort: Option<String>,
    pub dir: Option<String>,
}

pub struct PlanSortLink {
    pub label: &'static str,
    pub href: String,
    pub indicator: &'static str,
}

#[derive(Template)]
#[template(path = "plans/list.html")]
struct PlanListTemplate {
    layout: Layout,
    plans: Vec<Plan>,
    sort_links: Vec<PlanSortLink>,
    search: String,
    total: usize,
}

async fn list_plans(page: PageContext, Query(query): Query<PlanQuery>) -> Result<PlanListTemplate, AppError> {
    let plans = backend::plans::list_plans(&page.api).await?;
    let total = plans.len();
    let search = non_blank(&query.q).unwrap_or_default();
    let mut plans: Vec<Plan> = plans
        .into_iter()
        .filter(|p| p.matches_search(&search))
        .collect();

    let by = non_blank(&query.sort)
        .and_then(|s| PlanSort::parse(&s))
        .unwrap_or(PlanSort::Name);
    let direction = non_blank(&query.dir)
        .and_then(|d| SortDirection::parse(&d))
        .unwrap_or(SortDirection::Ascending);
    sort_plans(&mut plans, by, direction);

    let sort_links = [
        (PlanSort::Name, "Name"),
        (PlanSort::Lessons, "Lessons"),
        (PlanSort::Price, "Price"),
    ]
    .into_iter()
    .map(|(field, label)| {
        let next = if field == by { direction.reversed() } else { SortDirection::Ascending };
        PlanSortLink {
            label,
            href: format!(
                "/plans?{}",
                query_string([
                    ("q", search.clone()),
                    ("sort", field.as_str().to_string()),
                    ("dir", next.as_str().to_string()),
                ])
            ),
            indicator: match direction {
                _ if field != by => "",
                SortDirection::Ascending => "▲",
                SortDirection::Descending => "▼",
            },
        }
    })
    .collect();

    Ok(PlanListTemplate {
        layout: page.layout(Nav::Plans).await?,
        plans,
        sort_links,
        search,
        total,
    })
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlanForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub number_of_lessons: String,
    #[serde(default)]
    pub price: String,
}

impl PlanForm {
    fn payload(&self) -> Result<PlanPayload, String> {
        if self.name.trim().is_empty() {
            return Err("Plan name is required".to_string());
        }
        let number_of_lessons = self
            .number_of_lessons
            .trim()
            .parse::<i64>()
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| "Number of lessons must be a positive whole number".to_string())?;
        let price = self.price.trim();
        if !price.parse::<f64>().is_ok_and(|p| p >= 0.0 && p.is_finite()) {
            return Err("Price must be a non-negative amount".to_string());
        }
        Ok(PlanPayload {
            name: self.name.trim().to_string(),
            description: self.description.trim().to_string(),
            number_of_lessons,
            price: price.to_string(),
        })
    }
}

#[derive(Template)]
#[template(path = "plans/form.html")]
struct PlanFormTemplate {
    layout: Layout,
    heading: &'static str,
    action: String,
    form: PlanForm,
}

fn form_page(layout: Layout, plan_id: Option<i64>, form: PlanForm) -> PlanFormTemplate {
    PlanFormTemplate {
        layout,
        heading: if plan_id.is_some() { "Edit plan" } else { "New plan" },
        action: plan_id
            .map(|id| format!("/plans/{}", id))
            .unwrap_or_else(|| "/plans".to_string()),
        form,
    }
}

async fn new_plan(page: PageContext) -> Result<PlanFormTemplate, AppError> {
    Ok(form_page(page.layout(Nav::Plans).await?, None, PlanForm::default()))
}

async fn edit_plan(page: PageContext, Path(id): Path<i64>) -> Result<PlanFormTemplate, AppError> {
    let plan = backend::plans::get_plan(&page.api, id).await?;
    let form = PlanForm {
        name: plan.name,
        description: plan.description,
        number_of_lessons: plan.number_of_lessons.to_string(),
        price: plan.price.to_string(),
    };
    Ok(form_page(page.layout(Nav::Plans).await?, Some(id), form))
}

async fn save_plan(page: PageContext, plan_id: Option<i64>, form: PlanForm) -> Result<Response, AppError> {
    let payload = match form.payload() {
        Ok(payload) => payload,
        Err(message) => {
            let layout = page.layout_with(Nav::Plans, Toast::error("Invalid plan", message));
            return Ok((StatusCode::UNPROCESSABLE_ENTITY, form_page(layout, plan_id, form)).into_response());
        }
    };

    let result = match plan_id {
        Some(id) => backend::plans::update_plan(&page.api, id, &payload).await,
        None => backend::plans::create_plan(&page.api, &payload).await,
    };

    match result {
        Ok(plan) => {
            tracing::info!(plan_id = plan.id, "Plan saved");
            page.flash_redirect(
                Toast::success("Plan saved", format!("{} was saved", plan.name)),
                "/plans",
            )
            .await
        }
        Err(e) => {
            let e = recoverable(e)?;
            let layout = page.layout_with(Nav::Plans, Toast::from_api_error("Failed to save plan", &e));
            Ok((StatusCode::UNPROCESSABLE_ENTITY, form_page(layout, plan_id, form)).into_response())
        }
    }
}

async fn create_plan(page: PageContext, Form(form): Form<PlanForm>) -> Result<Response, AppError> {
    save_plan(page, None, form).await
}

async fn update_plan(
    page: PageContext,
    Path(id): Path<i64>,
    Form(form): Form<PlanForm>,
) -> Result<Response, AppError> {
    save_plan(page, Some(id), form).await
}

async fn delete_plan(page: PageContext, Path(id): Path<i64>) -> Result<Response, AppError> {
    let toast = match backend::plans::delete_plan(&page.api, id).await {
        Ok(()) => Toast::success("Plan deleted", "The plan was removed"),
        Err(e) => Toast::from_api_error("Failed to delete plan", &recoverable(e)?),
    };
    page.flash_redirect(toast, "/plans").await
}

/// Deletes every plan ticked on the list page. The form repeats `ids`
/// once per plan, which `Form` cannot collect.
async fn bulk_delete_plans(page: PageContext, body: Bytes) -> Result<Response, AppError> {
    let ids: Vec<i64> = all_values(&body, "ids")
        .iter()
        .filter_map(|id| id.trim().parse().ok())
        .collect();

    if ids.is_empty() {
        return page
            .flash_redirect(Toast::error("Nothing selected", "Select at least one plan"), "/plans")
            .await;
    }

    let mut deleted = 0;
    let mut failed = 0;
    for id in &ids {
        match backend::plans::delete_plan(&page.api, *id).await {
            Ok(()) => deleted += 1,
            Err(e) => {
                let e = recoverable(e)?;
                tracing::warn!(plan_id = id, error = %e, "Plan not deleted");
                failed += 1;
            }
        }
    }
    tracing::info!(deleted, failed, "Bulk plan delete");

    let toast = if failed == 0 {
        Toast::success("Plans deleted", format!("{} plan(s) removed", deleted))
    } else {
        Toast::error(
            "Some plans were not deleted",
            format!("{} removed, {} failed", deleted, failed),
        )
    };
    page.flash_redirect(toast, "/plans").await
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/plans", get(list_plans).post(create_plan))
        .route("/plans/new", get(new_plan))
        .route("/plans/bulk-delete", post(bulk_delete_plans))
        .route("/plans/:id", post(update_plan))
        .route("/plans/:id/edit", get(edit_plan))
        .route("/plans/:id/delete", post(delete_plan))
}
