use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

const RECENT_LIMIT: usize = 10;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ScanError {
    #[error("Scanner is not running")]
    NotRunning,

    #[error("Attendance already marked for today")]
    AlreadyScanned,

    #[error("Invalid QR code format: \"{0}\" is not a valid student ID number")]
    InvalidPayload(String),
}

/// Entry of the "recent scans" list shown beside the scanner
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanLogEntry {
    pub student_id: i64,
    pub student_name: Option<String>,
    pub lessons_remaining: Option<i64>,
    pub scanned_at: DateTime<Utc>,
}

impl ScanLogEntry {
    pub fn time_label(&self) -> String {
        self.scanned_at.format("%H:%M:%S").to_string()
    }

    pub fn name_label(&self) -> String {
        self.student_name
            .clone()
            .unwrap_or_else(|| format!("Student #{}", self.student_id))
    }

    pub fn lessons_label(&self) -> String {
        self.lessons_remaining
            .map(|n| n.to_string())
            .unwrap_or_else(|| "-".to_string())
    }
}

/// One browser's scanner.
///
/// Accepted payloads are remembered until a manual reset or until the
/// browser session ends. Stopping or switching sessions keeps them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScannerState {
    /// Class session scans are recorded against; `None` means quick scan
    pub session_id: Option<i64>,
    pub active: bool,
    scanned: BTreeSet<String>,
    recent: Vec<ScanLogEntry>,
}

impl ScannerState {
    pub fn start(&mut self, session_id: Option<i64>) {
        self.session_id = session_id;
        self.active = true;
    }

    pub fn stop(&mut self) {
        self.active = false;
    }

    /// Allows every payload to be scanned again
    pub fn reset(&mut self) {
        self.scanned.clear();
    }

    /// Claims a decoded payload for submission and returns the student id.
    ///
    /// Duplicates are rejected before the payload is parsed, so a repeated
    /// code never reaches the backend.
    pub fn accept(&mut self, raw: &str) -> Result<i64, ScanError> {
        if !self.active {
            return Err(ScanError::NotRunning);
        }

        let payload = raw.trim();
        if self.scanned.contains(payload) {
            return Err(ScanError::AlreadyScanned);
        }

        let student_id = payload
            .parse::<i64>()
            .map_err(|_| ScanError::InvalidPayload(payload.to_string()))?;

        self.scanned.insert(payload.to_string());
        Ok(student_id)
    }

    /// Gives a payload back after the backend refused it
    pub fn release(&mut self, raw: &str) {
        self.scanned.remove(raw.trim());
    }

    pub fn record(&mut self, entry: ScanLogEntry) {
        self.recent.insert(0, entry);
        self.recent.truncate(RECENT_LIMIT);
    }

    pub fn recent(&self) -> &[ScanLogEntry] {
        &self.recent
    }

    pub fn scanned_count(&self) -> usize {
        self.scanned.len()
    }
}

/// Scanners of every signed-in browser, keyed by session id.
///
/// Requests from the same browser run concurrently and each carries its own
/// copy of the session data, so the dedupe set lives here where a claim is
/// made under one write lock.
#[derive(Clone, Default)]
pub struct ScannerRegistry {
    scanners: Arc<RwLock<HashMap<String, ScannerState>>>,
}

impl ScannerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of a browser's scanner for rendering
    pub async fn snapshot(&self, key: &str) -> ScannerState {
        self.scanners
            .read()
            .await
            .get(key)
            .cloned()
            .unwrap_or_default()
    }

    /// Runs `f` on a browser's scanner while holding the write lock
    pub async fn update<R>(&self, key: &str, f: impl FnOnce(&mut ScannerState) -> R) -> R {
        let mut scanners = self.scanners.write().await;
        f(scanners.entry(key.to_string()).or_default())
    }

    /// Drops a browser's scanner when its session ends
    pub async fn forget(&self, key: &str) {
        self.scanners.write().await.remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn running() -> ScannerState {
        let mut state = ScannerState::default();
        state.start(Some(3));
        state
    }

    #[test]
    fn test_duplicate_payload_rejected() {
        let mut state = running();
        assert_eq!(state.accept("42"), Ok(42));
        assert_eq!(state.accept(" 42\n"), Err(ScanError::AlreadyScanned));
        assert_eq!(state.scanned_count(), 1);
    }

    #[test]
    fn test_invalid_payload_not_remembered() {
        let mut state = running();
        assert_eq!(
            state.accept("abc"),
            Err(ScanError::InvalidPayload("abc".to_string()))
        );
        assert_eq!(state.scanned_count(), 0);
    }

    #[test]
    fn test_release_and_reset() {
        let mut state = running();
        state.accept("7").unwrap();
        state.release("7");
        assert_eq!(state.accept("7"), Ok(7));

        state.reset();
        assert_eq!(state.accept("7"), Ok(7));
    }

    #[test]
    fn test_stop_and_restart_keep_scanned_codes() {
        let mut state = running();
        state.accept("7").unwrap();

        state.stop();
        assert_eq!(state.accept("8"), Err(ScanError::NotRunning));
        assert_eq!(state.scanned_count(), 1);

        state.start(None);
        assert_eq!(state.accept("7"), Err(ScanError::AlreadyScanned));
        assert_eq!(state.session_id, None);
    }

    #[test]
    fn test_recent_list_is_capped() {
        let mut state = running();
        for id in 0..15 {
            state.record(ScanLogEntry {
                student_id: id,
                student_name: None,
                lessons_remaining: Some(1),
                scanned_at: Utc::now(),
            });
        }
        assert_eq!(state.recent().len(), 10);
        assert_eq!(state.recent()[0].student_id, 14);
    }

    #[tokio::test]
    async fn test_registry_claims_once_across_clones() {
        let registry = ScannerRegistry::new();
        registry.update("browser-a", |s| s.start(None)).await;

        let other = registry.clone();
        let (first, second) = tokio::join!(
            registry.update("browser-a", |s| s.accept("12")),
            other.update("browser-a", |s| s.accept("12")),
        );
        assert!(first.is_ok() != second.is_ok());

        assert_eq!(
            registry.update("browser-b", |s| s.accept("12")).await,
            Err(ScanError::NotRunning)
        );

        registry.forget("browser-a").await;
        assert_eq!(registry.snapshot("browser-a").await, ScannerState::default());
    }
}
