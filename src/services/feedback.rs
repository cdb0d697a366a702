use serde::{Deserialize, Serialize};

use crate::services::backend::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastVariant {
    Success,
    Info,
    Error,
}

impl ToastVariant {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToastVariant::Success => "success",
            ToastVariant::Info => "info",
            ToastVariant::Error => "error",
        }
    }
}

/// One-shot notice shown on the next rendered page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Toast {
    pub title: String,
    pub description: String,
    pub variant: ToastVariant,
}

impl Toast {
    pub fn success(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            variant: ToastVariant::Success,
        }
    }

    pub fn info(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            variant: ToastVariant::Info,
        }
    }

    pub fn error(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            variant: ToastVariant::Error,
        }
    }

    /// Error toast carrying the backend's message as-is
    pub fn from_api_error(title: impl Into<String>, error: &ApiError) -> Self {
        Self::error(title, error.user_message())
    }

    pub fn variant_class(&self) -> &'static str {
        self.variant.as_str()
    }
}

/// Fixed categories for attendance submission failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanFailure {
    AlreadyMarked,
    InvalidStudent,
    InactiveSession,
    Generic,
}

impl ScanFailure {
    /// Matches the backend's error text on fixed fragments, ignoring case
    pub fn categorize(message: &str) -> Self {
        let message = message.to_lowercase();
        if message.contains("already") {
            ScanFailure::AlreadyMarked
        } else if message.contains("not found") || message.contains("invalid") {
            ScanFailure::InvalidStudent
        } else if ["inactive", "not active", "not in progress"]
            .iter()
            .any(|fragment| message.contains(fragment))
        {
            ScanFailure::InactiveSession
        } else {
            ScanFailure::Generic
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            ScanFailure::AlreadyMarked => "Already marked",
            ScanFailure::InvalidStudent => "Invalid student",
            ScanFailure::InactiveSession => "Session not active",
            ScanFailure::Generic => "Attendance failed",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ScanFailure::AlreadyMarked => "Attendance already marked for today",
            ScanFailure::InvalidStudent => "The scanned code does not belong to a known student",
            ScanFailure::InactiveSession => "This session is not currently accepting attendance",
            ScanFailure::Generic => "Could not record attendance. Please try again.",
        }
    }

    pub fn toast(&self) -> Toast {
        Toast::error(self.title(), self.description())
    }
}

/// Toast for a failed attendance submission.
///
/// Connection problems are reported as such; backend rejections are mapped
/// onto the fixed categories.
pub fn scan_failure_toast(error: &ApiError) -> Toast {
    match error {
        ApiError::Backend { message, .. } => ScanFailure::categorize(message).toast(),
        ApiError::SessionExpired => Toast::error("Signed out", error.user_message()),
        other => Toast::error(ScanFailure::Generic.title(), other.user_message()),
    }
}
