use secrecy::Secret;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Account roles known to the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    Instructor,
    Student,
    Parent,
}

impl UserRole {
    pub const ALL: [UserRole; 4] = [
        UserRole::Admin,
        UserRole::Instructor,
        UserRole::Student,
        UserRole::Parent,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "admin",
            UserRole::Instructor => "instructor",
            UserRole::Student => "student",
            UserRole::Parent => "parent",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            UserRole::Admin => "Admin",
            UserRole::Instructor => "Instructor",
            UserRole::Student => "Student",
            UserRole::Parent => "Parent",
        }
    }

    /// Whether accounts with this role may sign in at all
    pub fn can_sign_in(&self) -> bool {
        !matches!(self, UserRole::Parent)
    }

    /// School staff, who get the dashboard pages
    pub fn is_staff(&self) -> bool {
        matches!(self, UserRole::Admin | UserRole::Instructor)
    }

    /// Landing page for the role after login or a denied navigation
    pub fn home_path(&self) -> &'static str {
        match self {
            UserRole::Admin => "/",
            UserRole::Instructor => "/attendance/scan",
            UserRole::Student => "/portal",
            UserRole::Parent => "/login",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "admin" => Some(UserRole::Admin),
            "instructor" => Some(UserRole::Instructor),
            "student" => Some(UserRole::Student),
            "parent" => Some(UserRole::Parent),
            _ => None,
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Credentials posted to the token endpoint
#[derive(Debug, Deserialize)]
pub struct LoginCredentials {
    pub email: String,
    pub password: Secret<String>,
}

/// Token endpoint response
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub access: String,
    pub refresh: Option<String>,
    pub user_id: i64,
    pub email: String,
    pub role: UserRole,
}

/// Access/refresh token pair kept in the browser session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthTokens {
    pub access: String,
    pub refresh: Option<String>,
}

/// The signed-in dashboard user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    pub user_id: i64,
    pub email: String,
    pub role: UserRole,
}

impl CurrentUser {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

impl From<&LoginResponse> for CurrentUser {
    fn from(response: &LoginResponse) -> Self {
        Self {
            user_id: response.user_id,
            email: response.email.clone(),
            role: response.role,
        }
    }
}

/// Account to create from the settings page
#[derive(Debug)]
pub struct NewUser {
    pub email: String,
    pub password: Secret<String>,
    pub role: UserRole,
}

/// Entry of the accounts listing used by the settings page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserAccount {
    pub id: i64,
    pub email: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub role: UserRole,
}

impl UserAccount {
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name, self.last_name);
        let full = full.trim();
        if full.is_empty() {
            self.email.clone()
        } else {
            full.to_string()
        }
    }
}
