//! Per-engine parse caches.
//!
//! Expressions, regexes, and JSONPath queries recur across steps and runs;
//! each is parsed once per engine and cloned out of an unbounded map keyed
//! by the raw pattern text. The maps are cleared on demand through
//! `Engine::clear_caches`. A single engine instance must not be driven from
//! multiple threads; the mutexes only make cache access well-defined, not
//! the engine concurrent.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use regex::Regex;
use serde_json_path::JsonPath;

use crate::error::EngineError;
use crate::expr::parser::{self, Expression};

#[derive(Debug, Default)]
pub(crate) struct Caches {
    expressions: Mutex<HashMap<String, Expression>>,
    regexes: Mutex<HashMap<String, Regex>>,
    json_paths: Mutex<HashMap<String, JsonPath>>,
}

fn guard<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Caches {
    /// Parses an expression, memoizing by raw text.
    pub fn expression(&self, raw: &str) -> Result<Expression, EngineError> {
        let mut entries = guard(&self.expressions);
        if let Some(expression) = entries.get(raw) {
            return Ok(expression.clone());
        }
        let expression = parser::parse(raw)?;
        entries.insert(raw.to_string(), expression.clone());
        Ok(expression)
    }

    /// Compiles a criterion regex, memoizing by pattern.
    pub fn regex(&self, pattern: &str) -> Result<Regex, EngineError> {
        let mut entries = guard(&self.regexes);
        if let Some(regex) = entries.get(pattern) {
            return Ok(regex.clone());
        }
        let regex = Regex::new(pattern).map_err(|error| EngineError::evaluation(pattern, error))?;
        entries.insert(pattern.to_string(), regex.clone());
        Ok(regex)
    }

    /// Parses a criterion JSONPath query, memoizing by query text.
    pub fn json_path(&self, query: &str) -> Result<JsonPath, EngineError> {
        let mut entries = guard(&self.json_paths);
        if let Some(path) = entries.get(query) {
            return Ok(path.clone());
        }
        let path = JsonPath::parse(query).map_err(|error| EngineError::evaluation(query, error))?;
        entries.insert(query.to_string(), path.clone());
        Ok(path)
    }

    /// Drops every cached entry.
    pub fn clear(&self) {
        guard(&self.expressions).clear();
        guard(&self.regexes).clear();
        guard(&self.json_paths).clear();
    }
}
