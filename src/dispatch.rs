//! Request dispatch: `{action, ...}` options routed to a registered handler.
//!
//! Every outcome is rendered as plain text: `"Success!"` or the error
//! message. Nothing is raised to the caller.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::error::{Result, SyncError};
use crate::feed::{delete_rows, update_live_feed, MatchCriterion};
use crate::sheet::{edit_sheet, TargetOptions, WorkbookStore};

/// Response body of a successful request.
pub const SUCCESS: &str = "Success!";

/// Options decoded from a request, keyed by option name.
pub type Options = Map<String, Value>;

/// Runs one action against a store.
pub type ActionHandler = fn(&dyn WorkbookStore, &Options) -> Result<()>;

/// Raw request data as received by the web surface or the CLI.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestInput {
    /// POST body, expected to be a JSON object.
    pub body: Option<String>,
    /// GET query parameters in arrival order.
    pub params: Vec<(String, String)>,
}

impl RequestInput {
    pub fn from_body(body: impl Into<String>) -> Self {
        Self {
            body: Some(body.into()),
            params: Vec::new(),
        }
    }

    pub fn from_params(params: Vec<(String, String)>) -> Self {
        Self { body: None, params }
    }

    /// Decode the options. A body wins over query parameters.
    ///
    /// # Errors
    /// [`SyncError::Validation`] without any input or for a body that is
    /// not a JSON object; [`SyncError::Json`] for malformed JSON.
    pub fn options(&self) -> Result<Options> {
        if let Some(body) = self.body.as_deref().filter(|b| !b.trim().is_empty()) {
            return match serde_json::from_str::<Value>(body)? {
                Value::Object(map) => Ok(map),
                _ => Err(SyncError::validation("Request body must be a JSON object")),
            };
        }
        if self.params.is_empty() {
            return Err(SyncError::validation("No input found!"));
        }
        Ok(self
            .params
            .iter()
            .map(|(k, v)| (k.clone(), param_value(k, v)))
            .collect())
    }
}

/// Query parameters are strings; structured values arrive as JSON text.
fn param_value(key: &str, raw: &str) -> Value {
    let trimmed = raw.trim();
    if trimmed.starts_with('[') || trimmed.starts_with('{') {
        if let Ok(value) = serde_json::from_str(trimmed) {
            return value;
        }
    }
    match (key, trimmed) {
        (_, "true") => Value::Bool(true),
        (_, "false") => Value::Bool(false),
        ("sheet", n) => n
            .parse::<u64>()
            .map_or_else(|_| Value::String(raw.to_string()), Value::from),
        _ => Value::String(raw.to_string()),
    }
}

fn decode<T: for<'de> Deserialize<'de>>(options: &Options) -> Result<T> {
    Ok(serde_json::from_value(Value::Object(options.clone()))?)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LiveFeedOptions {
    #[serde(flatten)]
    target: TargetOptions,
    #[serde(default)]
    values: Vec<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeleteRowsOptions {
    #[serde(flatten)]
    target: TargetOptions,
    #[serde(default)]
    match_on: Vec<MatchCriterion>,
}

/// `updateLiveFeed`: push `values` onto the top of the target sheet.
///
/// # Errors
/// Target resolution, missing values, or storage errors.
pub fn live_feed_action(store: &dyn WorkbookStore, options: &Options) -> Result<()> {
    let opts: LiveFeedOptions = decode(options)?;
    let target = opts.target.resolve()?;
    edit_sheet(store, &target, |sheet| update_live_feed(sheet, &opts.values))
}

/// `deleteRowsFromSheet`: delete rows matching every `matchOn` criterion.
///
/// # Errors
/// Target resolution, criteria validation, or storage errors.
pub fn delete_rows_action(store: &dyn WorkbookStore, options: &Options) -> Result<()> {
    let opts: DeleteRowsOptions = decode(options)?;
    let target = opts.target.resolve()?;
    let deleted = edit_sheet(store, &target, |sheet| delete_rows(sheet, &opts.match_on))?;
    info!(deleted, "deleteRowsFromSheet");
    Ok(())
}

/// Routes requests to action handlers.
pub struct Dispatcher<S> {
    store: S,
    actions: BTreeMap<&'static str, ActionHandler>,
}

impl<S: WorkbookStore> Dispatcher<S> {
    /// A dispatcher with the built-in `updateLiveFeed` and
    /// `deleteRowsFromSheet` actions.
    pub fn new(store: S) -> Self {
        Self {
            store,
            actions: BTreeMap::new(),
        }
        .with_action("updateLiveFeed", live_feed_action)
        .with_action("deleteRowsFromSheet", delete_rows_action)
    }

    /// Register (or replace) an action.
    #[must_use]
    pub fn with_action(mut self, name: &'static str, handler: ActionHandler) -> Self {
        self.actions.insert(name, handler);
        self
    }

    pub fn actions(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.actions.keys().copied()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Decode and run one request.
    ///
    /// # Errors
    /// Anything from decoding, action lookup, or the handler.
    pub fn execute(&self, input: &RequestInput) -> Result<()> {
        let options = input.options()?;
        let action = match options.get("action") {
            Some(Value::String(action)) => action.as_str(),
            _ => {
                return Err(SyncError::validation(
                    "\"action\" must be defined in options",
                ))
            }
        };
        let handler = self
            .actions
            .get(action)
            .ok_or_else(|| SyncError::UnsupportedAction(action.to_string()))?;
        debug!(action, "Dispatching");
        handler(&self.store, &options)
    }

    /// Run a request and render its outcome as response text.
    pub fn handle(&self, input: &RequestInput) -> String {
        match self.execute(input) {
            Ok(()) => {
                info!("Request succeeded");
                SUCCESS.to_string()
            }
            Err(e) => {
                warn!(error = %e, "Request failed");
                e.to_string()
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::sheet::{MemoryStore, Sheet, Workbook};
    use crate::types::CellValue;
    use serde_json::json;
    use test_case::test_case;

    fn dispatcher() -> Dispatcher<MemoryStore> {
        let store = MemoryStore::new();
        let mut feed = Sheet::with_size("Feed", 3, 2);
        feed.set_values(
            0,
            0,
            &[
                vec!["id".into(), "name".into()],
                vec![1.0.into(), "one".into()],
            ],
        );
        store.insert("book", Workbook::from_sheets(vec![feed]).unwrap());
        Dispatcher::new(store)
    }

    #[test_case(RequestInput::default(), "No input found!" ; "no input")]
    #[test_case(RequestInput::from_body(r#"{"spreadsheetId":"book"}"#), "\"action\" must be defined in options" ; "missing action")]
    #[test_case(RequestInput::from_body(r#"{"action":"explode"}"#), "Invalid action: explode" ; "unknown action")]
    #[test_case(RequestInput::from_body(r#"{"action":"updateLiveFeed","values":[1]}"#), "\"spreadsheetId\" or \"spreadsheetUrl\" must be defined in options" ; "missing locator")]
    #[test_case(RequestInput::from_body(r#"{"action":"deleteRowsFromSheet","spreadsheetId":"book"}"#), "\"matchOn\" criteria must be defined in options" ; "missing criteria")]
    #[test_case(RequestInput::from_body(r#"{"action":"deleteRowsFromSheet","spreadsheetId":"book","matchOn":[{"key":"nope","value":1}]}"#), "Failed while trying to match against column that does not exist in sheet: nope" ; "unknown column")]
    fn test_error_text(input: RequestInput, expected: &str) {
        assert_eq!(dispatcher().handle(&input), expected);
    }

    #[test]
    fn test_live_feed_via_body() {
        let d = dispatcher();
        let body = json!({
            "action": "updateLiveFeed",
            "spreadsheetId": "book",
            "values": [2, "two"],
        });
        assert_eq!(d.handle(&RequestInput::from_body(body.to_string())), SUCCESS);
        let wb = d.store().get("book").unwrap();
        let sheet = wb.sheet(0).unwrap();
        assert_eq!(sheet.value(1, 1), &CellValue::from("two"));
        assert_eq!(sheet.value(2, 1), &CellValue::from("one"));
    }

    #[test]
    fn test_delete_rows_via_params() {
        let d = dispatcher();
        let input = RequestInput::from_params(vec![
            ("action".into(), "deleteRowsFromSheet".into()),
            ("spreadsheetId".into(), "book".into()),
            ("sheet".into(), "0".into()),
            ("matchOn".into(), r#"[{"key":"name","value":"one"}]"#.into()),
        ]);
        assert_eq!(d.handle(&input), SUCCESS);
        let wb = d.store().get("book").unwrap();
        assert_eq!(wb.sheet(0).unwrap().last_row(), 1);
    }

    #[test]
    fn test_param_values() {
        assert_eq!(param_value("sheet", "2"), json!(2));
        assert_eq!(param_value("sheet", "Feed"), json!("Feed"));
        assert_eq!(param_value("createSheet", "true"), json!(true));
        assert_eq!(param_value("values", "[1,\"a\"]"), json!([1, "a"]));
        assert_eq!(param_value("values", "[broken"), json!("[broken"));
        assert_eq!(param_value("spreadsheetId", "42"), json!("42"));
    }

    #[test]
    fn test_custom_action() {
        fn ping(_: &dyn WorkbookStore, _: &Options) -> Result<()> {
            Ok(())
        }
        let d = dispatcher().with_action("ping", ping);
        assert!(d.actions().any(|a| a == "ping"));
        assert_eq!(
            d.handle(&RequestInput::from_body(r#"{"action":"ping"}"#)),
            SUCCESS
        );
    }

    #[test]
    fn test_failed_action_leaves_workbook_untouched() {
        let d = dispatcher();
        let before = d.store().get("book").unwrap();
        let body = r#"{"action":"updateLiveFeed","spreadsheetId":"book","values":[]}"#;
        assert_eq!(
            d.handle(&RequestInput::from_body(body)),
            "\"values\" must be defined in options"
        );
        assert_eq!(d.store().get("book").unwrap(), before);
    }
}
