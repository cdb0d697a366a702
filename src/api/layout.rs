use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use crate::api::middleware::session::SESSION_KEY_FLASH;
use crate::error::AppError;
use crate::models::{CurrentUser, UserRole};
use crate::services::backend::ApiSession;
use crate::services::feedback::Toast;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nav {
    Dashboard,
    Students,
    Staff,
    Parents,
    Groups,
    Attendance,
    Scanner,
    Planning,
    Plans,
    Settings,
    Portal,
}

/// Who a sidebar link is shown to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    Staff,
    Admin,
    Student,
}

impl Audience {
    fn includes(&self, role: UserRole) -> bool {
        match self {
            Audience::Staff => role.is_staff(),
            Audience::Admin => role == UserRole::Admin,
            Audience::Student => role == UserRole::Student,
        }
    }
}

pub struct NavLink {
    pub nav: Nav,
    pub href: &'static str,
    pub label: &'static str,
    pub audience: Audience,
}

pub const NAV_LINKS: [NavLink; 11] = [
    NavLink { nav: Nav::Dashboard, href: "/", label: "Dashboard", audience: Audience::Staff },
    NavLink { nav: Nav::Students, href: "/students", label: "Students", audience: Audience::Admin },
    NavLink { nav: Nav::Staff, href: "/staff", label: "Staff", audience: Audience::Admin },
    NavLink { nav: Nav::Parents, href: "/parents", label: "Parents", audience: Audience::Admin },
    NavLink { nav: Nav::Groups, href: "/groups", label: "Groups", audience: Audience::Admin },
    NavLink { nav: Nav::Attendance, href: "/attendance", label: "Attendance", audience: Audience::Staff },
    NavLink { nav: Nav::Scanner, href: "/attendance/scan", label: "Scanner", audience: Audience::Staff },
    NavLink { nav: Nav::Planning, href: "/academic", label: "Academic planning", audience: Audience::Staff },
    NavLink { nav: Nav::Plans, href: "/plans", label: "Plans", audience: Audience::Admin },
    NavLink { nav: Nav::Settings, href: "/settings", label: "Settings", audience: Audience::Admin },
    NavLink { nav: Nav::Portal, href: "/portal", label: "My lessons", audience: Audience::Student },
];

/// Data the base template needs on every page
pub struct Layout {
    pub user: CurrentUser,
    pub active: Nav,
    pub toast: Option<Toast>,
}

impl Layout {
    pub fn links(&self) -> Vec<&'static NavLink> {
        NAV_LINKS
            .iter()
            .filter(|link| link.audience.includes(self.user.role))
            .collect()
    }

    pub fn is_active(&self, link: &NavLink) -> bool {
        link.nav == self.active
    }
}

/// Stores a toast for the next rendered page
pub async fn push_flash(session: &Session, toast: Toast) -> Result<(), AppError> {
    session.insert(SESSION_KEY_FLASH, toast).await?;
    Ok(())
}

/// Removes and returns the pending toast, if any
pub async fn take_flash(session: &Session) -> Result<Option<Toast>, AppError> {
    Ok(session.remove::<Toast>(SESSION_KEY_FLASH).await?)
}

/// Flashes a toast and redirects (post/redirect/get)
pub async fn flash_redirect(session: &Session, toast: Toast, to: &str) -> Result<Response, AppError> {
    push_flash(session, toast).await?;
    Ok(Redirect::to(to).into_response())
}

/// Per-request handles for a signed-in page.
///
/// Only available behind `require_auth`, which inserts the backend session
/// and the current user as request extensions.
pub struct PageContext {
    pub api: ApiSession,
    pub user: CurrentUser,
    pub session: Session,
}

impl PageContext {
    /// Layout for `active`, consuming any pending toast
    pub async fn layout(&self, active: Nav) -> Result<Layout, AppError> {
        Ok(Layout {
            user: self.user.clone(),
            active,
            toast: take_flash(&self.session).await?,
        })
    }

    /// Layout with a toast produced by this request, keeping the pending one
    /// for later
    pub fn layout_with(&self, active: Nav, toast: Toast) -> Layout {
        Layout {
            user: self.user.clone(),
            active,
            toast: Some(toast),
        }
    }

    pub async fn flash_redirect(&self, toast: Toast, to: &str) -> Result<Response, AppError> {
        flash_redirect(&self.session, toast, to).await
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for PageContext
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(|rejection| rejection.into_response())?;

        let api = parts.extensions.get::<ApiSession>().cloned();
        let user = parts.extensions.get::<CurrentUser>().cloned();

        match (api, user) {
            (Some(api), Some(user)) => Ok(Self { api, user, session }),
            _ => {
                tracing::error!("Page context requested outside the authenticated router");
                Err((StatusCode::INTERNAL_SERVER_ERROR, "Missing authentication context")
                    .into_response())
            }
        }
    }
}
