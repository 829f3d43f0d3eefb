//! Access Token Sources
//!
//! A request may carry its access token in several places. Sources are
//! tried in order and the first one that yields a non-empty token wins.

use std::collections::HashMap;

use axum::extract::Query;
use axum::http::{HeaderMap, Uri, header};

/// One place a token can be read from
pub trait TokenSource: Send + Sync {
    fn name(&self) -> &'static str;

    fn extract(&self, uri: &Uri, headers: &HeaderMap) -> Option<String>;
}

/// `?token=...`
#[derive(Debug, Clone)]
pub struct QueryParamSource {
    param: &'static str,
}

impl QueryParamSource {
    pub fn new(param: &'static str) -> Self {
        Self { param }
    }
}

impl TokenSource for QueryParamSource {
    fn name(&self) -> &'static str {
        "query"
    }

    fn extract(&self, uri: &Uri, _headers: &HeaderMap) -> Option<String> {
        let Query(params) = Query::<HashMap<String, String>>::try_from_uri(uri).ok()?;
        params
            .get(self.param)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .map(str::to_owned)
    }
}

/// `Authorization: Bearer ...`
#[derive(Debug, Clone, Copy, Default)]
pub struct BearerHeaderSource;

impl TokenSource for BearerHeaderSource {
    fn name(&self) -> &'static str {
        "bearer"
    }

    fn extract(&self, _uri: &Uri, headers: &HeaderMap) -> Option<String> {
        let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?.trim();
        let (scheme, token) = value.split_once(' ')?;
        if !scheme.eq_ignore_ascii_case("bearer") {
            return None;
        }
        let token = token.trim();
        (!token.is_empty()).then(|| token.to_owned())
    }
}

/// Ordered list of sources
pub struct TokenSourceChain {
    sources: Vec<Box<dyn TokenSource>>,
}

impl Default for TokenSourceChain {
    /// Query parameter first, then the bearer header
    fn default() -> Self {
        Self::new()
            .with(QueryParamSource::new("token"))
            .with(BearerHeaderSource)
    }
}

impl TokenSourceChain {
    /// Empty chain
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
        }
    }

    pub fn with(mut self, source: impl TokenSource + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }

    pub fn extract(&self, uri: &Uri, headers: &HeaderMap) -> Option<String> {
        self.sources.iter().find_map(|source| {
            let token = source.extract(uri, headers)?;
            tracing::trace!(source = source.name(), "Access token found");
            Some(token)
        })
    }
}
