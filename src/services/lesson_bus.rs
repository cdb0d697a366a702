use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

const CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonsChanged {
    pub student_id: i64,
    pub lessons_remaining: i64,
}

#[derive(Debug, Clone)]
pub struct LessonBus {
    tx: broadcast::Sender<LessonsChanged>,
}

impl LessonBus {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    /// Returns the number of listeners reached; zero is not an error
    pub fn publish(&self, event: LessonsChanged) -> usize {
        tracing::debug!(
            student_id = event.student_id,
            lessons_remaining = event.lessons_remaining,
            "Publishing lesson change"
        );
        self.tx.send(event).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LessonsChanged> {
        self.tx.subscribe()
    }
}

impl Default for LessonBus {
    fn default() -> Self {
        Self::new()
    }
}
