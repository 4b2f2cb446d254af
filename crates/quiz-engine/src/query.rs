//! Collection query parameters.

use crate::error::ValidationError;
use chrono::{NaiveDate, SecondsFormat};

/// Structured filter identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterKey {
    Material,
    StartDate,
    EndDate,
}

/// A structured filter value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// Restrict to quizzes generated from one material.
    Material(String),
    /// Only attempts on or after this day.
    StartDate(NaiveDate),
    /// Only attempts up to the start of this day.
    EndDate(NaiveDate),
}

impl Filter {
    pub fn key(&self) -> FilterKey {
        match self {
            Self::Material(_) => FilterKey::Material,
            Self::StartDate(_) => FilterKey::StartDate,
            Self::EndDate(_) => FilterKey::EndDate,
        }
    }
}

/// Active structured filters, at most one per key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filters {
    pub material: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl Filters {
    /// Apply a filter. Returns true if the effective value changed.
    pub fn set(&mut self, filter: Filter) -> bool {
        match filter {
            Filter::Material(id) => replace(&mut self.material, Some(id).filter(|s| !s.is_empty())),
            Filter::StartDate(d) => replace(&mut self.start_date, Some(d)),
            Filter::EndDate(d) => replace(&mut self.end_date, Some(d)),
        }
    }

    /// Remove a filter. Returns true if one was set.
    pub fn clear(&mut self, key: FilterKey) -> bool {
        match key {
            FilterKey::Material => self.material.take().is_some(),
            FilterKey::StartDate => self.start_date.take().is_some(),
            FilterKey::EndDate => self.end_date.take().is_some(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.material.is_none() && self.start_date.is_none() && self.end_date.is_none()
    }
}

fn replace<T: PartialEq>(slot: &mut Option<T>, value: Option<T>) -> bool {
    if *slot == value {
        false
    } else {
        *slot = value;
        true
    }
}

/// The effective query for one collection fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionQuery {
    /// 1-based page number.
    pub page: u32,
    /// Fixed page size for the view.
    pub limit: u32,
    /// Committed (debounced) search text.
    pub search: String,
    pub filters: Filters,
}

impl CollectionQuery {
    pub fn new(limit: u32) -> Self {
        Self {
            page: 1,
            limit: limit.max(1),
            search: String::new(),
            filters: Filters::default(),
        }
    }

    /// Whether any search or structured filter narrows the result.
    pub fn is_filtered(&self) -> bool {
        !self.search.is_empty() || !self.filters.is_empty()
    }

    /// Query-string pairs in the order the backend documents them.
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("page", self.page.to_string()), ("limit", self.limit.to_string())];

        if !self.search.is_empty() {
            params.push(("search", self.search.clone()));
        }
        if let Some(material) = &self.filters.material {
            params.push(("material", material.clone()));
        }
        if let Some(start) = self.filters.start_date {
            params.push(("start_date", iso_day_start(start)));
        }
        if let Some(end) = self.filters.end_date {
            params.push(("end_date", iso_day_start(end)));
        }

        params
    }
}

/// Midnight UTC of `day` as `YYYY-MM-DDT00:00:00.000Z`.
pub fn iso_day_start(day: NaiveDate) -> String {
    day.and_time(chrono::NaiveTime::MIN)
        .and_utc()
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse a `YYYY-MM-DD` date typed by the user.
pub fn parse_date(input: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d")
        .map_err(|_| ValidationError::InvalidDate(input.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_minimal() {
        let q = CollectionQuery::new(8);
        assert_eq!(
            q.to_params(),
            vec![("page", "1".to_string()), ("limit", "8".to_string())]
        );
        assert!(!q.is_filtered());
    }

    #[test]
    fn test_params_full() {
        let mut q = CollectionQuery::new(5);
        q.page = 2;
        q.search = "bio".to_string();
        q.filters.set(Filter::StartDate(NaiveDate::from_ymd_opt(2024, 1, 31).unwrap()));
        q.filters.set(Filter::EndDate(NaiveDate::from_ymd_opt(2024, 2, 1).unwrap()));

        let params = q.to_params();
        assert_eq!(params[2], ("search", "bio".to_string()));
        assert_eq!(params[3], ("start_date", "2024-01-31T00:00:00.000Z".to_string()));
        assert_eq!(params[4], ("end_date", "2024-02-01T00:00:00.000Z".to_string()));
    }

    #[test]
    fn test_filter_set_reports_change() {
        let mut f = Filters::default();
        assert!(f.set(Filter::Material("m1".into())));
        assert!(!f.set(Filter::Material("m1".into())));
        assert!(f.set(Filter::Material(String::new())));
        assert_eq!(f.material, None);
        assert!(!f.clear(FilterKey::Material));
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(
            parse_date(" 2024-05-06 "),
            Ok(NaiveDate::from_ymd_opt(2024, 5, 6).unwrap())
        );
        assert_eq!(
            parse_date("06/05/2024"),
            Err(ValidationError::InvalidDate("06/05/2024".to_string()))
        );
    }
}
