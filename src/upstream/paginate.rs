//! Fetch-all walker for ERP list endpoints.
//!
//! The ERP answers list calls either with a bare JSON array or with an object
//! holding the records under one of [`LIST_KEYS`]. The shape seen on the first
//! page decides the shape of the aggregated result; later pages only
//! contribute records. Any page without a record list stops the walk and is
//! returned as the upstream sent it.

use async_trait::async_trait;
use serde_json::{Map, Value};

use super::client::UniplusClient;
use super::{QueryParams, DEFAULT_LIMIT, LIST_KEYS, MAX_PAGES};
use crate::errors::AppError;

/// Anything that can answer one page of a listing.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch_page(&self, path: &str, params: &QueryParams) -> Result<Value, AppError>;
}

#[async_trait]
impl PageSource for UniplusClient {
    async fn fetch_page(&self, path: &str, params: &QueryParams) -> Result<Value, AppError> {
        self.get(path, params).await
    }
}

/// One page after its record list has been located.
#[derive(Debug, PartialEq)]
pub enum ListEnvelope {
    Bare(Vec<Value>),
    Wrapped {
        key: &'static str,
        records: Vec<Value>,
        rest: Map<String, Value>,
    },
}

impl ListEnvelope {
    /// Locates the record list in `payload`, handing the payload back
    /// untouched when it is not a listing.
    pub fn locate(payload: Value) -> Result<ListEnvelope, Value> {
        match payload {
            Value::Array(records) => Ok(ListEnvelope::Bare(records)),
            Value::Object(mut obj) => {
                let key = LIST_KEYS
                    .iter()
                    .copied()
                    .find(|k| matches!(obj.get(*k), Some(Value::Array(_))));
                match key.and_then(|k| obj.remove(k).map(|v| (k, v))) {
                    Some((key, Value::Array(records))) => Ok(ListEnvelope::Wrapped {
                        key,
                        records,
                        rest: obj,
                    }),
                    _ => Err(Value::Object(obj)),
                }
            }
            other => Err(other),
        }
    }

    fn into_records(self) -> Vec<Value> {
        match self {
            ListEnvelope::Bare(records) => records,
            ListEnvelope::Wrapped { records, .. } => records,
        }
    }
}

/// Records gathered so far, in the shape fixed by the first page.
struct Accumulator {
    wrapper: Option<(&'static str, Map<String, Value>)>,
    records: Vec<Value>,
}

impl Accumulator {
    fn from_first(page: ListEnvelope) -> Self {
        match page {
            ListEnvelope::Bare(records) => Self { wrapper: None, records },
            ListEnvelope::Wrapped { key, records, rest } => Self {
                wrapper: Some((key, rest)),
                records,
            },
        }
    }

    fn into_value(self) -> Value {
        match self.wrapper {
            None => Value::Array(self.records),
            Some((key, mut rest)) => {
                rest.insert(key.to_string(), Value::Array(self.records));
                Value::Object(rest)
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Paginator {
    max_pages: usize,
}

impl Default for Paginator {
    fn default() -> Self {
        Self { max_pages: MAX_PAGES }
    }
}

impl Paginator {
    pub fn with_max_pages(max_pages: usize) -> Self {
        Self { max_pages }
    }

    /// Walks `path` page by page until a short page, concatenating records.
    ///
    /// `limit` and `offset` in `base` set the page size and starting point.
    /// A first page that is not a listing is returned as-is. Reaching the
    /// page ceiling without a short page is an error, never a truncation.
    pub async fn fetch_all_pages<S>(
        &self,
        source: &S,
        path: &str,
        base: &QueryParams,
    ) -> Result<Value, AppError>
    where
        S: PageSource + ?Sized,
    {
        let limit = parse_usize(base.get("limit"))
            .filter(|l| *l > 0)
            .unwrap_or(DEFAULT_LIMIT);
        let mut offset = parse_usize(base.get("offset")).unwrap_or(0);
        let mut acc: Option<Accumulator> = None;

        for page in 0..self.max_pages {
            let mut params = base.clone();
            params.insert("limit".into(), limit.to_string());
            params.insert("offset".into(), offset.to_string());

            let payload = source.fetch_page(path, &params).await?;
            let envelope = match ListEnvelope::locate(payload) {
                Ok(envelope) => envelope,
                Err(raw) => {
                    if page == 0 {
                        tracing::debug!(path, "first page is not a listing, returning it verbatim");
                    } else {
                        tracing::warn!(path, page, offset, "page without a record list, returning it verbatim");
                    }
                    return Ok(raw);
                }
            };

            let (next, count) = match acc.take() {
                None => {
                    let first = Accumulator::from_first(envelope);
                    let count = first.records.len();
                    (first, count)
                }
                Some(mut current) => {
                    let records = envelope.into_records();
                    let count = records.len();
                    current.records.extend(records);
                    (current, count)
                }
            };

            tracing::debug!(path, page, offset, count, "fetched page");
            if count < limit {
                return Ok(next.into_value());
            }

            acc = Some(next);
            offset += limit;
        }

        tracing::error!(path, max_pages = self.max_pages, "pagination ceiling reached");
        Err(AppError::pagination_exhausted(self.max_pages))
    }
}

fn parse_usize(raw: Option<&String>) -> Option<usize> {
    raw.and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite() && *v >= 0.0)
        .map(|v| v as usize)
}
