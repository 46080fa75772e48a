//! Outbound side: ERP token cache, ERP client, list paginator and the
//! Portal Comercial client.

use std::collections::BTreeMap;

use crate::errors::AppError;

pub mod client;
pub mod paginate;
pub mod portal;
pub mod token;

/// Query string forwarded to the ERP (filters use the `campo.op` convention).
pub type QueryParams = BTreeMap<String, String>;

/// Page size the ERP uses when none is given.
pub const DEFAULT_LIMIT: usize = 25;

/// Largest page the ERP accepts.
pub const MAX_PAGE_SIZE: usize = 100;

/// Ceiling on pages walked by a single fetch-all listing.
pub const MAX_PAGES: usize = 1000;

/// Object keys that may hold the record list of a wrapped ERP listing, in match order.
pub const LIST_KEYS: [&str; 6] = ["data", "items", "registros", "records", "content", "conteudo"];

/// Encodes one caller-supplied value as a single URL path segment.
///
/// Route params arrive already percent-decoded, so `/`, `?` and `#` must be
/// re-encoded before they reach an upstream URL. Dot segments would be
/// collapsed by the URL parser and are refused outright.
pub fn path_segment(raw: &str) -> Result<String, AppError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "." || trimmed == ".." {
        return Err(AppError::validation("Parametro de caminho invalido."));
    }
    Ok(urlencoding::encode(trimmed).into_owned())
}
