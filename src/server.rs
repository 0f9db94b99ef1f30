//! HTTP surface for the dispatcher: `GET /exec` and `POST /exec`.
//!
//! Responses are always `200 text/plain`; failures are reported in the body.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use parking_lot::Mutex;
use tracing::{error, info};

use crate::dispatch::{Dispatcher, RequestInput};
use crate::error::Result;
use crate::sheet::WorkbookStore;

/// Shared dispatcher; one request runs at a time.
pub struct AppState<S> {
    dispatcher: Arc<Mutex<Dispatcher<S>>>,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            dispatcher: Arc::clone(&self.dispatcher),
        }
    }
}

impl<S> AppState<S> {
    pub fn new(dispatcher: Dispatcher<S>) -> Self {
        Self {
            dispatcher: Arc::new(Mutex::new(dispatcher)),
        }
    }
}

pub fn router<S>(state: AppState<S>) -> Router
where
    S: WorkbookStore + Send + 'static,
{
    Router::new()
        .route("/exec", get(exec_get::<S>).post(exec_post::<S>))
        .with_state(state)
}

async fn exec_get<S>(
    State(state): State<AppState<S>>,
    Query(params): Query<Vec<(String, String)>>,
) -> impl IntoResponse
where
    S: WorkbookStore + Send + 'static,
{
    text(run(state, RequestInput::from_params(params)).await)
}

async fn exec_post<S>(State(state): State<AppState<S>>, body: String) -> impl IntoResponse
where
    S: WorkbookStore + Send + 'static,
{
    text(run(state, RequestInput::from_body(body)).await)
}

/// Workbook I/O blocks, so the dispatcher runs off the async workers.
async fn run<S>(state: AppState<S>, input: RequestInput) -> String
where
    S: WorkbookStore + Send + 'static,
{
    let joined =
        tokio::task::spawn_blocking(move || state.dispatcher.lock().handle(&input)).await;
    match joined {
        Ok(body) => body,
        Err(e) => {
            error!(error = %e, "Dispatch task failed");
            format!("Internal error: {e}")
        }
    }
}

fn text(body: String) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        body,
    )
}

/// Bind `addr` and serve until the process is stopped.
///
/// # Errors
/// Bind or accept-loop I/O failures.
pub async fn serve<S>(addr: SocketAddr, dispatcher: Dispatcher<S>) -> Result<()>
where
    S: WorkbookStore + Send + 'static,
{
    let app = router(AppState::new(dispatcher));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(bind_addr = %addr, "rezsync listening");
    axum::serve(listener, app).await?;
    Ok(())
}
