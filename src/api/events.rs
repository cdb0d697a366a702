// Open pages receive a `lessons` event per attendance mutation and update
// the matching student row.

use std::convert::Infallible;
use std::time::Duration;

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
    Router,
};
use futures::stream::{self, Stream};
use tokio::sync::broadcast::error::RecvError;

use crate::api::middleware::session::AppState;
use crate::models::CurrentUser;
use crate::services::lesson_bus::LessonBus;

async fn lesson_events(
    State(bus): State<LessonBus>,
    axum::Extension(user): axum::Extension<CurrentUser>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    tracing::debug!(user_id = user.user_id, "Lesson event stream opened");

    let receiver = bus.subscribe();
    let stream = stream::unfold(receiver, |mut receiver| async move {
        loop {
            match receiver.recv().await {
                Ok(change) => {
                    let event = Event::default()
                        .event("lessons")
                        .json_data(&change)
                        .unwrap_or_else(|_| Event::default().comment("unencodable event"));
                    return Some((Ok(event), receiver));
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Lesson event stream lagged");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/events/lessons", get(lesson_events))
}
