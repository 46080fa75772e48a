//! How a list request becomes upstream calls: filter shaping, the
//! one-page vs fetch-all decision and the `single` projection.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::upstream::{QueryParams, DEFAULT_LIMIT, MAX_PAGE_SIZE};

/// Inbound list query with the control flags split off.
/// `single` and `all` are never forwarded upstream.
#[derive(Debug, Clone, Default)]
pub struct ListQuery {
    pub params: QueryParams,
    pub single: bool,
    pub all: Option<bool>,
}

impl ListQuery {
    pub fn from_raw(mut raw: BTreeMap<String, String>) -> Self {
        let single = raw.remove("single").as_deref() == Some("true");
        let all = raw.remove("all").map(|v| v == "true");
        Self { params: raw, single, all }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListMode {
    OnePage,
    All,
}

/// Per-resource rule for picking a mode when the client did not say `all`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListPolicy {
    /// `single`, then `offset`, then `limit` (the default page size still
    /// means everything), else fetch-all.
    FetchAllByDefault,
    /// One page unless `all=true`.
    OnePageByDefault,
}

impl ListPolicy {
    pub fn mode(&self, query: &ListQuery) -> ListMode {
        if let Some(all) = query.all {
            return if all { ListMode::All } else { ListMode::OnePage };
        }
        match self {
            ListPolicy::OnePageByDefault => ListMode::OnePage,
            ListPolicy::FetchAllByDefault => {
                if query.single || query.params.contains_key("offset") {
                    ListMode::OnePage
                } else if let Some(limit) = query.params.get("limit") {
                    if parse_number(limit) == Some(DEFAULT_LIMIT as f64) {
                        ListMode::All
                    } else {
                        ListMode::OnePage
                    }
                } else {
                    ListMode::All
                }
            }
        }
    }
}

/// Rewrites bare filter keys into the ERP `campo.op` form, unless the
/// suffixed key was already supplied.
pub fn shape_filters(mut params: QueryParams, rules: &[(&str, &str)]) -> QueryParams {
    for (field, op) in rules {
        let target = format!("{}.{}", field, op);
        if params.contains_key(&target) {
            continue;
        }
        if let Some(value) = params.remove(*field) {
            params.insert(target, value);
        }
    }
    params
}

/// Clamps a numeric `limit` to the largest page the ERP accepts.
pub fn clamp_page(mut params: QueryParams) -> QueryParams {
    if let Some(limit) = params.get("limit").and_then(|l| parse_number(l)) {
        let clamped = limit.min(MAX_PAGE_SIZE as f64).max(0.0) as usize;
        params.insert("limit".into(), clamped.to_string());
    }
    params
}

/// Page size used when walking every page.
pub fn fetch_all_page_size(all_limit: usize) -> usize {
    all_limit.clamp(1, MAX_PAGE_SIZE)
}

/// `single=true` projection: first element of an array (or null), anything
/// else unchanged.
pub fn first_record(data: Value) -> Value {
    match data {
        Value::Array(mut records) => {
            if records.is_empty() {
                Value::Null
            } else {
                records.swap_remove(0)
            }
        }
        other => other,
    }
}

pub fn params_to_json(params: &QueryParams) -> Value {
    Value::Object(
        params
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect(),
    )
}

fn parse_number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}
