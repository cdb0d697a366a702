use askama::Template;
use axum::{
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Router,
};
use chrono::{Local, NaiveDate};
use serde::Deserialize;
use tower_sessions::Session;

use crate::api::forms::{local_path, non_blank, parse_opt, query_string};
use crate::api::layout::{Layout, Nav, PageContext};
use crate::api::middleware::session::{AppState, SESSION_KEY_LAST_UPDATE};
use crate::error::AppError;
use crate::models::group::{LANGUAGES, LEVELS};
use crate::models::{AttendanceRecord, AttendanceStatus, AttendanceUpdate};
use crate::services::attendance;
use crate::services::backend;
use crate::services::export;
use crate::services::feedback::Toast;
use crate::services::table::{
    paginate, AttendanceFilter, AttendanceStats, Page, SortDirection, SortField, SortState,
};

/// Viewer state as carried in the query string
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AttendanceQuery {
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub status: Option<String>,
    pub level: Option<String>,
    pub language: Option<String>,
    pub q: Option<String>,
    pub student_id: Option<String>,
    pub sort: Option<String>,
    pub dir: Option<String>,
    pub page: Option<String>,
}

fn parse_date(value: &Option<String>) -> Option<NaiveDate> {
    non_blank(value).and_then(|v| NaiveDate::parse_from_str(&v, "%Y-%m-%d").ok())
}

impl AttendanceQuery {
    pub fn filter(&self) -> AttendanceFilter {
        AttendanceFilter {
            date_from: parse_date(&self.date_from),
            date_to: parse_date(&self.date_to),
            status: non_blank(&self.status).and_then(|s| AttendanceStatus::parse(&s)),
            level: non_blank(&self.level),
            language: non_blank(&self.language),
            student_search: non_blank(&self.q),
            student_id: parse_opt(&self.student_id),
        }
    }

    pub fn sort_state(&self) -> SortState {
        match non_blank(&self.sort).and_then(|s| SortField::parse(&s)) {
            Some(field) => {
                let direction = non_blank(&self.dir)
                    .and_then(|d| SortDirection::parse(&d))
                    .unwrap_or_else(|| SortState::default_direction(field));
                SortState::new(Some(field), direction)
            }
            None => SortState::default(),
        }
    }

    fn page_number(&self) -> usize {
        parse_opt(&self.page).unwrap_or(1)
    }

    /// Query string for the filters only; sort and page are appended by
    /// the caller
    fn filter_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("date_from", non_blank(&self.date_from).unwrap_or_default()),
            ("date_to", non_blank(&self.date_to).unwrap_or_default()),
            ("status", non_blank(&self.status).unwrap_or_default()),
            ("level", non_blank(&self.level).unwrap_or_default()),
            ("language", non_blank(&self.language).unwrap_or_default()),
            ("q", non_blank(&self.q).unwrap_or_default()),
            ("student_id", non_blank(&self.student_id).unwrap_or_default()),
        ]
    }

    fn href(&self, sort: SortState, page: usize) -> String {
        let mut pairs = self.filter_pairs();
        if let Some(field) = sort.field {
            pairs.push(("sort", field.as_str().to_string()));
            pairs.push(("dir", sort.direction.as_str().to_string()));
        }
        if page > 1 {
            pairs.push(("page", page.to_string()));
        }
        let query = query_string(pairs);
        if query.is_empty() {
            "/attendance".to_string()
        } else {
            format!("/attendance?{}", query)
        }
    }

    fn export_href(&self) -> String {
        let mut pairs = self.filter_pairs();
        let sort = self.sort_state();
        if let Some(field) = sort.field {
            pairs.push(("sort", field.as_str().to_string()));
            pairs.push(("dir", sort.direction.as_str().to_string()));
        }
        let query = query_string(pairs);
        if query.is_empty() {
            "/attendance/export.csv".to_string()
        } else {
            format!("/attendance/export.csv?{}", query)
        }
    }
}

pub struct SortLink {
    pub label: &'static str,
    pub href: String,
    pub indicator: &'static str,
}

pub struct PageLink {
    pub number: usize,
    pub href: String,
    pub current: bool,
}

#[derive(Template)]
#[template(path = "attendance/list.html")]
struct AttendanceTemplate {
    layout: Layout,
    query: AttendanceQuery,
    stats: AttendanceStats,
    page: Page<AttendanceRecord>,
    sort_links: Vec<SortLink>,
    page_links: Vec<PageLink>,
    previous_href: Option<String>,
    next_href: Option<String>,
    current_href: String,
    export_href: String,
    filtered: bool,
    updated_id: Option<i64>,
    statuses: [AttendanceStatus; 3],
    levels: [&'static str; 6],
    languages: [&'static str; 10],
}

impl AttendanceTemplate {
    fn selected(&self, field: &Option<String>, value: &str) -> bool {
        non_blank(field).is_some_and(|v| v.eq_ignore_ascii_case(value))
    }

    fn field_value(&self, field: &Option<String>) -> String {
        non_blank(field).unwrap_or_default()
    }

    fn is_updated(&self, record: &AttendanceRecord) -> bool {
        self.updated_id == Some(record.id)
    }
}

/// Merges the status change made just before the redirect into the fetched
/// list, so the edited row shows the backend's returned values even when
/// the listing lags behind. Returns the edited record id when it is listed.
async fn merge_last_update(
    session: &Session,
    records: &mut [AttendanceRecord],
) -> Result<Option<i64>, AppError> {
    let Some(update) = session
        .remove::<AttendanceUpdate>(SESSION_KEY_LAST_UPDATE)
        .await?
    else {
        return Ok(None);
    };
    let found = attendance::apply_update(records, &update);
    Ok(found.then_some(update.attendance.id))
}

/// Filters then sorts the fetched records
fn visible_records(records: &[AttendanceRecord], query: &AttendanceQuery) -> Vec<AttendanceRecord> {
    let mut rows = query.filter().apply(records);
    query.sort_state().sort(&mut rows);
    rows.into_iter().cloned().collect()
}

async fn attendance_page(
    State(state): State<AppState>,
    page: PageContext,
    Query(query): Query<AttendanceQuery>,
) -> Result<AttendanceTemplate, AppError> {
    let mut records = backend::attendance::list_attendance(&page.api).await?;
    let updated_id = merge_last_update(&page.session, &mut records).await?;

    let stats = AttendanceStats::from_records(&records);
    let rows = visible_records(&records, &query);
    let sort = query.sort_state();
    let current = paginate(rows, query.page_number(), state.config.page_size);

    tracing::debug!(
        fetched = records.len(),
        visible = current.total_items,
        page = current.page,
        "Attendance viewer loaded"
    );

    let sort_links = [
        (SortField::StudentName, "Student"),
        (SortField::Date, "Date"),
        (SortField::Status, "Status"),
    ]
    .into_iter()
    .map(|(field, label)| SortLink {
        label,
        href: query.href(sort.after_click(field), 1),
        indicator: match (sort.field, sort.direction) {
            (Some(f), SortDirection::Ascending) if f == field => "▲",
            (Some(f), SortDirection::Descending) if f == field => "▼",
            _ => "",
        },
    })
    .collect();

    let page_links = current
        .numbers()
        .into_iter()
        .map(|number| PageLink {
            number,
            href: query.href(sort, number),
            current: number == current.page,
        })
        .collect();

    Ok(AttendanceTemplate {
        layout: page.layout(Nav::Attendance).await?,
        stats,
        sort_links,
        page_links,
        previous_href: current
            .has_previous()
            .then(|| query.href(sort, current.page - 1)),
        next_href: current.has_next().then(|| query.href(sort, current.page + 1)),
        current_href: query.href(sort, current.page),
        export_href: query.export_href(),
        filtered: !query.filter().is_empty(),
        updated_id,
        page: current,
        query,
        statuses: AttendanceStatus::ALL,
        levels: LEVELS,
        languages: LANGUAGES,
    })
}

async fn export_csv(
    page: PageContext,
    Query(query): Query<AttendanceQuery>,
) -> Result<Response, AppError> {
    let records = backend::attendance::list_attendance(&page.api).await?;
    let rows = visible_records(&records, &query);
    let body = export::attendance_csv(&rows)?;

    let filename = format!(
        "attendance_export_{}.csv",
        Local::now().date_naive().format("%Y-%m-%d")
    );
    tracing::info!(rows = rows.len(), "Attendance exported");

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        body,
    )
        .into_response())
}

#[derive(Debug, Deserialize)]
pub struct StatusForm {
    pub status: String,
    pub return_to: Option<String>,
}

async fn change_status(
    State(state): State<AppState>,
    page: PageContext,
    Path(record_id): Path<i64>,
    Form(form): Form<StatusForm>,
) -> Result<Response, AppError> {
    let back = local_path(form.return_to.as_deref(), "/attendance");

    let Some(status) = AttendanceStatus::parse(&form.status) else {
        return page
            .flash_redirect(
                Toast::error("Invalid status", format!("\"{}\" is not a status", form.status)),
                &back,
            )
            .await;
    };

    let toast = match attendance::change_status(&page.api, &state.lesson_bus, record_id, status).await
    {
        Ok(update) => {
            let toast = Toast::success(
                "Attendance updated",
                format!(
                    "Marked {}. Lessons remaining: {}. Balance: {}",
                    update.attendance.status.label(),
                    update.lessons_remaining,
                    update.subscription_balance
                ),
            );
            page.session.insert(SESSION_KEY_LAST_UPDATE, &update).await?;
            toast
        }
        Err(e @ backend::ApiError::SessionExpired) => return Err(e.into()),
        Err(e) => Toast::from_api_error("Failed to update attendance", &e),
    };

    page.flash_redirect(toast, &back).await
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/attendance", get(attendance_page))
        .route("/attendance/export.csv", get(export_csv))
        .route("/attendance/:id/status", post(change_status))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_builds_filter() {
        let query = AttendanceQuery {
            date_from: Some("2024-03-01".to_string()),
            date_to: Some("".to_string()),
            status: Some("Present".to_string()),
            q: Some("  ".to_string()),
            student_id: Some("12".to_string()),
            ..Default::default()
        };
        let filter = query.filter();
        assert_eq!(filter.date_from, NaiveDate::from_ymd_opt(2024, 3, 1));
        assert_eq!(filter.date_to, None);
        assert_eq!(filter.status, Some(AttendanceStatus::Present));
        assert_eq!(filter.student_search, None);
        assert_eq!(filter.student_id, Some(12));
    }

    #[test]
    fn test_href_keeps_filters() {
        let query = AttendanceQuery {
            status: Some("late".to_string()),
            ..Default::default()
        };
        let sort = SortState::new(Some(SortField::StudentName), SortDirection::Ascending);
        assert_eq!(
            query.href(sort, 2),
            "/attendance?status=late&sort=student_name&dir=asc&page=2"
        );
        assert_eq!(
            AttendanceQuery::default().href(SortState::new(None, SortDirection::Ascending), 1),
            "/attendance"
        );
    }

    #[test]
    fn test_unknown_sort_falls_back_to_default() {
        let query = AttendanceQuery {
            sort: Some("teacher".to_string()),
            ..Default::default()
        };
        assert_eq!(query.sort_state(), SortState::default());
    }
}
