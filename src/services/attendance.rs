use chrono::Utc;

use crate::models::attendance::{
    AttendanceRecord, AttendanceStatus, AttendanceSubmission, AttendanceUpdate,
};
use crate::models::student::LessonReceipt;
use crate::models::Amount;
use crate::services::backend::{self, ApiError, ApiSession};
use crate::services::feedback::{scan_failure_toast, ScanFailure, Toast};
use crate::services::lesson_bus::{LessonBus, LessonsChanged};
use crate::services::scanner::{ScanError, ScanLogEntry, ScannerRegistry};

#[derive(thiserror::Error, Debug)]
pub enum ScanFlowError {
    #[error(transparent)]
    Local(#[from] ScanError),

    #[error(transparent)]
    Backend(#[from] ApiError),
}

impl ScanFlowError {
    pub fn toast(&self) -> Toast {
        match self {
            ScanFlowError::Local(ScanError::AlreadyScanned) => ScanFailure::AlreadyMarked.toast(),
            ScanFlowError::Local(e @ ScanError::InvalidPayload(_)) => {
                Toast::error("Invalid QR code", e.to_string())
            }
            ScanFlowError::Local(ScanError::NotRunning) => {
                Toast::info("Scanner stopped", "Start the scanner before scanning codes")
            }
            ScanFlowError::Backend(e) => scan_failure_toast(e),
        }
    }

    pub fn is_session_expired(&self) -> bool {
        matches!(self, ScanFlowError::Backend(ApiError::SessionExpired))
    }
}

/// What the backend reported for an accepted scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOutcome {
    pub student_id: i64,
    pub student_name: Option<String>,
    pub lessons_remaining: Option<i64>,
    pub subscription_balance: Option<Amount>,
    pub message: Option<String>,
}

impl ScanOutcome {
    pub fn toast(&self) -> Toast {
        let description = match (&self.message, self.lessons_remaining) {
            (Some(message), Some(left)) => format!("{}. Lessons remaining: {}", message, left),
            (Some(message), None) => message.clone(),
            (None, Some(left)) => format!("Lessons remaining: {}", left),
            (None, None) => format!("Student #{} marked present", self.student_id),
        };
        Toast::success("Attendance recorded", description)
    }
}

/// Reads a receipt that may report failure inside a 2xx body
fn receipt_outcome(student_id: i64, receipt: LessonReceipt) -> Result<ScanOutcome, ApiError> {
    if !receipt.success && receipt.lessons_remaining.is_none() {
        return Err(ApiError::Backend {
            status: reqwest::StatusCode::BAD_REQUEST,
            message: receipt
                .message
                .unwrap_or_else(|| "Attendance was not recorded".to_string()),
        });
    }
    Ok(ScanOutcome {
        student_id,
        student_name: None,
        lessons_remaining: receipt.lessons_remaining,
        subscription_balance: receipt.subscription_balance,
        message: receipt.message,
    })
}

/// Submits one decoded QR payload from the scanner registered under
/// `scanner_key`.
///
/// The payload is claimed under the registry lock before any backend call.
/// With a session selected the scan is recorded against it; without one the
/// backend's quick reduce-lesson action is used. A payload the backend
/// refuses is released so it can be scanned again after the problem is fixed.
#[tracing::instrument(skip(api, bus, scanners, scanner_key))]
pub async fn submit_scan(
    api: &ApiSession,
    bus: &LessonBus,
    scanners: &ScannerRegistry,
    scanner_key: &str,
    raw: &str,
) -> Result<ScanOutcome, ScanFlowError> {
    let (student_id, session_id) = scanners
        .update(scanner_key, |scanner| {
            scanner.accept(raw).map(|id| (id, scanner.session_id))
        })
        .await?;

    let result = match session_id {
        Some(session_id) => backend::attendance::submit_scan(api, session_id, student_id)
            .await
            .map(|submission| {
                let record = submission.record();
                ScanOutcome {
                    student_id,
                    student_name: record.student_name.clone(),
                    lessons_remaining: submission.lessons_remaining(),
                    subscription_balance: match &submission {
                        AttendanceSubmission::Update(u) => Some(u.subscription_balance.clone()),
                        AttendanceSubmission::Record(_) => None,
                    },
                    message: None,
                }
            }),
        None => backend::students::reduce_lesson(api, student_id)
            .await
            .and_then(|receipt| receipt_outcome(student_id, receipt)),
    };

    let outcome = match result {
        Ok(outcome) => outcome,
        Err(e) => {
            scanners
                .update(scanner_key, |scanner| scanner.release(raw))
                .await;
            tracing::info!(student_id, ?session_id, error = %e, "Scan refused");
            return Err(e.into());
        }
    };

    tracing::info!(
        student_id,
        ?session_id,
        lessons_remaining = ?outcome.lessons_remaining,
        "Attendance recorded"
    );

    if let Some(lessons_remaining) = outcome.lessons_remaining {
        bus.publish(LessonsChanged {
            student_id,
            lessons_remaining,
        });
    }

    let entry = ScanLogEntry {
        student_id,
        student_name: outcome.student_name.clone(),
        lessons_remaining: outcome.lessons_remaining,
        scanned_at: Utc::now(),
    };
    scanners
        .update(scanner_key, |scanner| scanner.record(entry))
        .await;

    Ok(outcome)
}

/// Marks today's attendance for one student through the per-student scan
/// endpoint, as the check-in button on the student's QR page does.
#[tracing::instrument(skip(api, bus, qr_payload))]
pub async fn check_in(
    api: &ApiSession,
    bus: &LessonBus,
    student_id: i64,
    qr_payload: &str,
) -> Result<ScanOutcome, ApiError> {
    let receipt = backend::students::scan_student(api, student_id, qr_payload).await?;
    let outcome = receipt_outcome(student_id, receipt)?;
    if let Some(lessons_remaining) = outcome.lessons_remaining {
        bus.publish(LessonsChanged {
            student_id,
            lessons_remaining,
        });
    }
    Ok(outcome)
}

/// Changes a record's status and broadcasts the backend's new lesson count
#[tracing::instrument(skip(api, bus), fields(status = %status))]
pub async fn change_status(
    api: &ApiSession,
    bus: &LessonBus,
    record_id: i64,
    status: AttendanceStatus,
) -> Result<AttendanceUpdate, ApiError> {
    let update = backend::attendance::change_status(api, record_id, status).await?;

    tracing::info!(
        record_id,
        student_id = update.attendance.student,
        lessons_remaining = update.lessons_remaining,
        "Attendance status changed"
    );

    bus.publish(LessonsChanged {
        student_id: update.attendance.student,
        lessons_remaining: update.lessons_remaining,
    });

    Ok(update)
}

/// Merges a backend update into a fetched list.
///
/// The edited record takes the returned status; every record of the same
/// student takes the returned lesson count. Returns whether the edited
/// record was present.
pub fn apply_update(records: &mut [AttendanceRecord], update: &AttendanceUpdate) -> bool {
    let mut found = false;
    for record in records.iter_mut() {
        if record.id == update.attendance.id {
            record.status = update.attendance.status;
            found = true;
        }
        if record.student == update.attendance.student {
            record.lessons_remaining = Some(update.lessons_remaining);
        }
    }
    found
}
