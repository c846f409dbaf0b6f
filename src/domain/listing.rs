//! Framework-free description of a list request.

use std::collections::BTreeMap;
use std::fmt;

use super::DomainError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    /// Parse the `order` query parameter. Absent means ascending.
    pub fn parse(raw: Option<&str>) -> Result<Self, DomainError> {
        match raw.map(str::trim) {
            None | Some("") => Ok(SortOrder::Asc),
            Some(v) if v.eq_ignore_ascii_case("asc") => Ok(SortOrder::Asc),
            Some(v) if v.eq_ignore_ascii_case("desc") => Ok(SortOrder::Desc),
            Some(v) => Err(DomainError::Validation(format!(
                "order must be 'asc' or 'desc', got '{}'",
                v
            ))),
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortOrder::Asc => write!(f, "asc"),
            SortOrder::Desc => write!(f, "desc"),
        }
    }
}

/// Page, sort and filter criteria recognized by a list endpoint.
///
/// `criteria` maps a criterion name declared by the endpoint's `FilterSpec`
/// to its raw value. Blank values are never stored.
#[derive(Debug, Clone, Default)]
pub struct ListParams {
    pub page: u64,
    pub sort: Option<String>,
    pub order: SortOrder,
    pub criteria: BTreeMap<String, String>,
}

impl ListParams {
    pub fn new(page: Option<u64>, sort: Option<String>, order: SortOrder) -> Self {
        Self {
            page: page.unwrap_or(0),
            sort: sort.filter(|s| !s.trim().is_empty()),
            order,
            criteria: BTreeMap::new(),
        }
    }

    /// Add a criterion; `None` and blank values contribute nothing.
    pub fn with(mut self, key: &str, value: Option<impl Into<String>>) -> Self {
        if let Some(value) = value {
            let value = value.into();
            if !value.trim().is_empty() {
                self.criteria.insert(key.to_string(), value.trim().to_string());
            }
        }
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.criteria.get(key).map(String::as_str)
    }

    /// Stable textual form used as a cache key suffix.
    pub fn cache_key(&self) -> String {
        let mut key = format!(
            "page={}&sort={}&order={}",
            self.page,
            self.sort.as_deref().unwrap_or(""),
            self.order
        );
        for (k, v) in &self.criteria {
            key.push('&');
            key.push_str(k);
            key.push('=');
            key.push_str(&v.to_lowercase());
        }
        key
    }
}
