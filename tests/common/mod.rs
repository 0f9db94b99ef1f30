//! Shared fakes for the integration tests.
#![allow(
    dead_code,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic
)]

use std::collections::{HashMap, VecDeque};

use parking_lot::Mutex;
use rezsync::backend::http::{HttpClient, HttpRequest, HttpResponse, TransportError};
use rezsync::config::StaticCredentials;
use rezsync::notify::{Notification, Notifier};
use rezsync::sheet::{MemoryStore, Sheet, Workbook};
use rezsync::types::{CellValue, Record, ResponseOutcome, Scalar};
use rezsync::{Backend, Result};
use serde_json::Value;

pub const ENDPOINT: &str = "https://demo.starrezhousing.com/StarRezRest";
pub const AUTHORIZATION: &str = "Basic dXNlcjp0b2tlbg==";

pub fn credentials() -> StaticCredentials {
    StaticCredentials {
        authorization: Some(AUTHORIZATION.into()),
        endpoint: Some(ENDPOINT.into()),
    }
}

/// HTTP client that replays queued responses and records every request.
#[derive(Default)]
pub struct FakeHttp {
    responses: Mutex<VecDeque<std::result::Result<HttpResponse, String>>>,
    pub requests: Mutex<Vec<HttpRequest>>,
}

impl FakeHttp {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, status: u16, body: &str) -> Self {
        self.responses.lock().push_back(Ok(HttpResponse {
            status,
            body: body.to_string(),
        }));
        self
    }

    pub fn fail(self, message: &str) -> Self {
        self.responses.lock().push_back(Err(message.to_string()));
        self
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().clone()
    }
}

impl HttpClient for FakeHttp {
    fn fetch(&self, request: &HttpRequest) -> std::result::Result<HttpResponse, TransportError> {
        self.requests.lock().push(request.clone());
        match self.responses.lock().pop_front() {
            Some(Ok(response)) => Ok(response),
            Some(Err(message)) => Err(TransportError(message)),
            None => panic!("unexpected request to {}", request.url),
        }
    }
}

/// Backend answering by query text or report id.
#[derive(Default)]
pub struct FakeBackend {
    outcomes: HashMap<String, ResponseOutcome>,
    pub calls: Mutex<Vec<String>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, outcome: ResponseOutcome) -> Self {
        self.outcomes.insert(key.to_string(), outcome);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    fn answer(&self, key: &str) -> ResponseOutcome {
        self.calls.lock().push(key.to_string());
        self.outcomes
            .get(key)
            .cloned()
            .unwrap_or_else(|| failure(404, &format!("no fake outcome for {key}")))
    }
}

impl Backend for FakeBackend {
    fn execute_query(&self, query: &str) -> Result<ResponseOutcome> {
        Ok(self.answer(query))
    }

    fn execute_report(&self, report_id: &str, _body: Option<&Value>) -> Result<ResponseOutcome> {
        Ok(self.answer(report_id))
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<Notification>>,
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: &Notification) -> Result<()> {
        self.sent.lock().push(notification.clone());
        Ok(())
    }
}

pub fn failure(status: u16, message: &str) -> ResponseOutcome {
    ResponseOutcome::Failure {
        status: Some(status),
        message: message.to_string(),
    }
}

/// Records from `(key, value)` rows.
pub fn records(rows: &[&[(&str, Scalar)]]) -> Vec<Record> {
    rows.iter()
        .map(|row| {
            row.iter().fold(Record::new(), |r, (k, v)| r.with(*k, v.clone()))
        })
        .collect()
}

pub fn text(s: &str) -> Scalar {
    Scalar::Text(s.to_string())
}

/// A store holding one workbook `book` with the given sheets.
pub fn store_with(sheets: Vec<Sheet>) -> MemoryStore {
    let store = MemoryStore::new();
    store.insert("book", Workbook::from_sheets(sheets).unwrap());
    store
}

pub fn cell(s: &str) -> CellValue {
    CellValue::Text(s.to_string())
}
