//! Room location lookup backed by the cached reference table.
//!
//! The match pattern is built from reference text verbatim. Metacharacters
//! in descriptions are not escaped, so a description such as `Hall (East)`
//! changes the pattern's meaning, and an unbalanced one fails to compile
//! ([`SyncError::Pattern`]).

use regex::{Regex, RegexBuilder};
use tracing::{debug, info};

use crate::backend::Backend;
use crate::cache::TtlCache;
use crate::error::{Result, SyncError};
use crate::types::{LocationQuery, ResponseOutcome, RoomLocation};

pub const REFERENCE_TABLE_KEY: &str = "RoomLocationTable";
pub const MATCH_PATTERN_KEY: &str = "RoomLocationRegExp";

/// Active room locations only (`RecordTypeEnum=0`).
pub const REFERENCE_TABLE_QUERY: &str = "SELECT RoomLocationID, [Building Code], Description, WebDescription FROM RoomLocation WHERE RecordTypeEnum=0";

pub struct LocationResolver<B> {
    backend: B,
    cache: TtlCache,
}

impl<B: Backend> LocationResolver<B> {
    pub fn new(backend: B, cache: TtlCache) -> Self {
        Self { backend, cache }
    }

    #[must_use]
    pub fn cache(&self) -> &TtlCache {
        &self.cache
    }

    /// Reference table, from cache or (on miss) from the backend.
    ///
    /// # Errors
    /// Configuration errors from the backend client, [`SyncError::Backend`]
    /// when the fetch fails (failures are not cached), or a shape error.
    pub fn load_reference_table(&self) -> Result<Vec<RoomLocation>> {
        if let Some(cached) = self.cache.get(REFERENCE_TABLE_KEY) {
            debug!("Using cached room location table");
            return Ok(serde_json::from_str(&cached)?);
        }

        info!("Fetching room location table");
        let table = match self.backend.execute_query(REFERENCE_TABLE_QUERY)? {
            ResponseOutcome::Success(records) => records
                .iter()
                .map(RoomLocation::from_record)
                .collect::<Result<Vec<_>>>()?,
            ResponseOutcome::Empty => Vec::new(),
            ResponseOutcome::Failure { status, message } => {
                return Err(SyncError::Backend { status, message });
            }
        };

        self.cache
            .put(REFERENCE_TABLE_KEY, serde_json::to_string(&table)?);
        Ok(table)
    }

    /// Pattern source matching any web description, description, or code.
    ///
    /// # Errors
    /// See [`Self::load_reference_table`].
    pub fn match_pattern_source(&self) -> Result<String> {
        if let Some(cached) = self.cache.get(MATCH_PATTERN_KEY) {
            debug!("Using cached room location pattern");
            return Ok(cached);
        }

        info!("Generating room location pattern");
        let table = self.load_reference_table()?;
        let alternatives: Vec<&str> = table.iter().flat_map(RoomLocation::match_texts).collect();
        let source = format!(r"(?:\b)({})(?:\b)", alternatives.join("|"));
        self.cache.put(MATCH_PATTERN_KEY, source.clone());
        Ok(source)
    }

    /// Case-insensitive alternation over every reference text.
    ///
    /// Only the source string is cached; it is compiled on each call.
    ///
    /// # Errors
    /// [`SyncError::Pattern`] if reference text breaks the pattern.
    pub fn build_match_pattern(&self) -> Result<Regex> {
        let source = self.match_pattern_source()?;
        Ok(RegexBuilder::new(&source).case_insensitive(true).build()?)
    }

    /// First entry matching `input`: by exact id for numbers, by
    /// case-insensitive substring of code/description/web description for
    /// text. `None` when nothing matches.
    ///
    /// # Errors
    /// See [`Self::load_reference_table`].
    pub fn resolve(&self, input: impl Into<LocationQuery>) -> Result<Option<RoomLocation>> {
        let table = self.load_reference_table()?;
        Ok(find_in_table(&table, &input.into()).cloned())
    }

    /// Every reference entry mentioned in `text`, in order of first
    /// appearance, without duplicates.
    ///
    /// # Errors
    /// See [`Self::build_match_pattern`].
    pub fn find_mentions(&self, text: &str) -> Result<Vec<RoomLocation>> {
        let pattern = self.build_match_pattern()?;
        let table = self.load_reference_table()?;
        let mut found: Vec<RoomLocation> = Vec::new();
        for m in pattern.find_iter(text) {
            if m.as_str().is_empty() {
                continue;
            }
            let query = LocationQuery::Text(m.as_str().to_string());
            if let Some(entry) = find_in_table(&table, &query) {
                if !found.iter().any(|e| e.id == entry.id) {
                    found.push(entry.clone());
                }
            }
        }
        Ok(found)
    }
}

fn find_in_table<'a>(table: &'a [RoomLocation], query: &LocationQuery) -> Option<&'a RoomLocation> {
    match query {
        LocationQuery::Id(id) => table.iter().find(|e| e.id == *id),
        LocationQuery::Text(text) => {
            let needle = text.to_lowercase();
            table.iter().find(|e| {
                e.match_texts()
                    .iter()
                    .any(|field| field.to_lowercase().contains(&needle))
            })
        }
    }
}
