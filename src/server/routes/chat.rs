//! Chat endpoints: a single complete answer, and a server-sent-events
//! token stream.

use std::convert::Infallible;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Json;
use futures_util::{stream, Stream, StreamExt};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::orchestrator::AnswerEvent;
use crate::server::state::AppState;
use crate::types::{QueryRequest, QueryResponse};

pub async fn chat(State(state): State<AppState>, Json(request): Json<QueryRequest>) -> Result<Json<QueryResponse>> {
    if !request.is_within_length_bound() {
        return Err(Error::QueryEmpty);
    }

    let (response, sources) = state
        .orchestrator
        .answer(&request.message, &request.history)
        .await?;

    Ok(Json(QueryResponse { response, sources }))
}

#[derive(Debug, Serialize)]
struct StreamEvent {
    chunk: String,
    done: bool,
    sources: Option<Vec<String>>,
}

pub async fn chat_stream(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Result<Sse<impl Stream<Item = std::result::Result<Event, Infallible>>>> {
    if !request.is_within_length_bound() {
        return Err(Error::QueryEmpty);
    }

    let answer_stream = state
        .orchestrator
        .answer_stream(&request.message, &request.history)
        .await?;

    let events = answer_stream.map(|event| {
        let payload = match event {
            Ok(AnswerEvent::Token(chunk)) => StreamEvent {
                chunk,
                done: false,
                sources: None,
            },
            Ok(AnswerEvent::Done { sources }) => StreamEvent {
                chunk: String::new(),
                done: true,
                sources: Some(sources),
            },
            Err(e) => {
                tracing::error!(error = %e, "answer stream failed mid-generation");
                StreamEvent {
                    chunk: "Sorry, something went wrong while generating a response.".to_string(),
                    done: true,
                    sources: Some(Vec::new()),
                }
            }
        };
        Ok(Event::default().data(serde_json::to_string(&payload).unwrap_or_default()))
    });

    // A trailing literal `[DONE]` sentinel after the terminal JSON event, for
    // clients written against the OpenAI-style streaming convention.
    let done_sentinel = stream::once(async { Ok(Event::default().data("[DONE]")) });

    Ok(Sse::new(events.chain(done_sentinel)).keep_alive(KeepAlive::default()))
}
