//! Filter set supplied by the caller
//!
//! The dashboard's filter panel produces a loose name -> value(s) mapping.
//! This module closes that boundary: only the enumerated sales filters are
//! accepted, values are validated on entry, and storage is canonical
//! (B-tree ordered fields, B-tree ordered value sets) so that two filter
//! sets denoting the same constraints compare equal regardless of how the
//! caller assembled them.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::error::{Error, Result};

/// The recognized sales filters.
///
/// Variant order matches the lexicographic order of the warehouse column
/// names, so B-tree iteration doubles as canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FilterField {
    City,
    Country,
    PaymentMethod,
    Product,
    Size,
}

impl FilterField {
    /// Column name in the warehouse schema
    pub fn column(&self) -> &'static str {
        match self {
            FilterField::City => "city",
            FilterField::Country => "country",
            FilterField::PaymentMethod => "paymentMethod",
            FilterField::Product => "product",
            FilterField::Size => "size",
        }
    }

    /// Parse an external filter name. Accepts both the CLI spelling
    /// (`payment_method`) and the warehouse column spelling (`paymentMethod`).
    pub fn parse(name: &str) -> Result<Self> {
        match name {
            "city" => Ok(FilterField::City),
            "country" => Ok(FilterField::Country),
            "payment_method" | "paymentMethod" => Ok(FilterField::PaymentMethod),
            "product" => Ok(FilterField::Product),
            "size" => Ok(FilterField::Size),
            other => Err(Error::UnknownFilter(other.to_string())),
        }
    }
}

impl fmt::Display for FilterField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

/// Accepted value(s) for a single filter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterValue {
    /// Exactly this value (`col = ?`)
    One(String),
    /// Any of these values (`col IN (?, ...)`); always non-empty and sorted
    AnyOf(BTreeSet<String>),
}

/// Normalized set of query constraints.
///
/// Absent fields mean "no constraint". Setting a field to an empty value
/// set removes the constraint, so absent and empty are indistinguishable
/// from here on down and hash to the same cache key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSet {
    filters: BTreeMap<FilterField, FilterValue>,
}

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Constrain `field` to exactly `value`
    pub fn set(&mut self, field: FilterField, value: impl Into<String>) -> Result<()> {
        let value = value.into();
        validate_value(field, &value)?;
        self.filters.insert(field, FilterValue::One(value));
        Ok(())
    }

    /// Constrain `field` to any of `values`. An empty iterator clears the
    /// constraint; a single value collapses to the `=` form.
    pub fn set_any_of<I, S>(&mut self, field: FilterField, values: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut set = BTreeSet::new();
        for value in values {
            let value = value.into();
            validate_value(field, &value)?;
            set.insert(value);
        }
        match set.len() {
            0 => {
                self.filters.remove(&field);
            }
            1 => {
                if let Some(value) = set.into_iter().next() {
                    self.filters.insert(field, FilterValue::One(value));
                }
            }
            _ => {
                self.filters.insert(field, FilterValue::AnyOf(set));
            }
        }
        Ok(())
    }

    /// Builder-style variant of [`set`](Self::set)
    pub fn with(mut self, field: FilterField, value: impl Into<String>) -> Result<Self> {
        self.set(field, value)?;
        Ok(self)
    }

    /// Builder-style variant of [`set_any_of`](Self::set_any_of)
    pub fn with_any_of<I, S>(mut self, field: FilterField, values: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.set_any_of(field, values)?;
        Ok(self)
    }

    /// Drop the constraint on `field`, returning whether one existed
    pub fn remove(&mut self, field: FilterField) -> bool {
        self.filters.remove(&field).is_some()
    }

    pub fn get(&self, field: FilterField) -> Option<&FilterValue> {
        self.filters.get(&field)
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    /// Iterate constraints in canonical (column name) order
    pub fn iter(&self) -> impl Iterator<Item = (FilterField, &FilterValue)> {
        self.filters.iter().map(|(f, v)| (*f, v))
    }

    /// Parse a CLI-style `name=value` or `name=v1,v2,...` entry
    pub fn apply_entry(&mut self, entry: &str) -> Result<()> {
        let (name, raw) = entry.split_once('=').ok_or_else(|| Error::InvalidFilter {
            field: entry.to_string(),
            reason: "expected name=value".to_string(),
        })?;
        let field = FilterField::parse(name.trim())?;
        let values: Vec<&str> = raw
            .split(',')
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .collect();
        self.set_any_of(field, values)
    }
}

/// Values end up in canonical encodings and bound SQL parameters; control
/// characters have no representation in either.
fn validate_value(field: FilterField, value: &str) -> Result<()> {
    if value.chars().any(|c| c.is_control()) {
        return Err(Error::InvalidFilter {
            field: field.column().to_string(),
            reason: "contains control characters".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insertion_order_is_irrelevant() {
        let mut a = FilterSet::new();
        a.set(FilterField::PaymentMethod, "amex").unwrap();
        a.set_any_of(FilterField::Country, ["US", "CA"]).unwrap();

        let mut b = FilterSet::new();
        b.set_any_of(FilterField::Country, ["CA", "US"]).unwrap();
        b.set(FilterField::PaymentMethod, "amex").unwrap();

        assert_eq!(a, b);
    }

    #[test]
    fn test_empty_set_clears_constraint() {
        let mut filters = FilterSet::new();
        filters.set(FilterField::Product, "Pearly Pies").unwrap();
        filters
            .set_any_of(FilterField::Product, Vec::<String>::new())
            .unwrap();

        assert!(filters.is_empty());
        assert_eq!(filters, FilterSet::new());
    }

    #[test]
    fn test_single_value_set_collapses_to_one() {
        let mut a = FilterSet::new();
        a.set_any_of(FilterField::Size, ["M"]).unwrap();

        let mut b = FilterSet::new();
        b.set(FilterField::Size, "M").unwrap();

        assert_eq!(a, b);
    }

    #[test]
    fn test_duplicate_values_deduplicate() {
        let mut filters = FilterSet::new();
        filters
            .set_any_of(FilterField::Country, ["US", "US", "CA"])
            .unwrap();

        match filters.get(FilterField::Country) {
            Some(FilterValue::AnyOf(set)) => assert_eq!(set.len(), 2),
            other => panic!("Expected AnyOf, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = FilterField::parse("flavor").unwrap_err();
        match err {
            Error::UnknownFilter(name) => assert_eq!(name, "flavor"),
            other => panic!("Expected UnknownFilter, got {:?}", other),
        }
    }

    #[test]
    fn test_both_name_spellings_accepted() {
        assert_eq!(
            FilterField::parse("payment_method").unwrap(),
            FilterField::PaymentMethod
        );
        assert_eq!(
            FilterField::parse("paymentMethod").unwrap(),
            FilterField::PaymentMethod
        );
    }

    #[test]
    fn test_control_characters_rejected() {
        let mut filters = FilterSet::new();
        let err = filters
            .set(FilterField::Product, "bread\u{0}crumb")
            .unwrap_err();
        match err {
            Error::InvalidFilter { field, .. } => assert_eq!(field, "product"),
            other => panic!("Expected InvalidFilter, got {:?}", other),
        }
    }

    #[test]
    fn test_spaces_and_punctuation_allowed() {
        let mut filters = FilterSet::new();
        filters
            .set(FilterField::Product, "Golden Gate Ginger")
            .unwrap();
        filters.set(FilterField::City, "San Francisco, CA").unwrap();
        assert_eq!(filters.len(), 2);
    }

    #[test]
    fn test_apply_entry_single() {
        let mut filters = FilterSet::new();
        filters.apply_entry("product=bread").unwrap();
        assert_eq!(
            filters.get(FilterField::Product),
            Some(&FilterValue::One("bread".to_string()))
        );
    }

    #[test]
    fn test_apply_entry_multi() {
        let mut filters = FilterSet::new();
        filters.apply_entry("country=US, CA").unwrap();
        match filters.get(FilterField::Country) {
            Some(FilterValue::AnyOf(set)) => {
                assert!(set.contains("US"));
                assert!(set.contains("CA"));
            }
            other => panic!("Expected AnyOf, got {:?}", other),
        }
    }

    #[test]
    fn test_apply_entry_missing_equals() {
        let mut filters = FilterSet::new();
        assert!(filters.apply_entry("product").is_err());
    }

    #[test]
    fn test_iteration_order_is_canonical() {
        let mut filters = FilterSet::new();
        filters.set(FilterField::Size, "L").unwrap();
        filters.set(FilterField::City, "Tokyo").unwrap();
        filters.set(FilterField::Product, "Tokyo Tidbits").unwrap();

        let columns: Vec<&str> = filters.iter().map(|(f, _)| f.column()).collect();
        assert_eq!(columns, vec!["city", "product", "size"]);
    }
}
