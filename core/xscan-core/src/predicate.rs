//! Column value ranges pushed down to the hosted reader for source-side pruning.
//!
//! The planner builds one [`ColumnValueRange`] per constrained column and
//! hands the whole [`PredicateRanges`] map to the scanner behind an `Arc`.
//! The scanner only reads it.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;

/// Column name → value range.
pub type PredicateRanges = HashMap<String, ColumnValueRange>;

/// 리터럴 값
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Literal {
    Boolean(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl Literal {
    /// Ordering between literals of the same kind; `None` across kinds.
    pub fn partial_cmp_same(&self, other: &Literal) -> Option<Ordering> {
        match (self, other) {
            (Literal::Boolean(a), Literal::Boolean(b)) => Some(a.cmp(b)),
            (Literal::Int(a), Literal::Int(b)) => Some(a.cmp(b)),
            (Literal::Float(a), Literal::Float(b)) => a.partial_cmp(b),
            (Literal::Int(a), Literal::Float(b)) => (*a as f64).partial_cmp(b),
            (Literal::Float(a), Literal::Int(b)) => a.partial_cmp(&(*b as f64)),
            (Literal::String(a), Literal::String(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

/// One side of a range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeBound {
    pub value: Literal,
    pub inclusive: bool,
}

/// min/max/in-list constraint on a single column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnValueRange {
    pub column: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub low: Option<RangeBound>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub high: Option<RangeBound>,
    /// Fixed value set; intersected with the bounds when both are present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_list: Option<Vec<Literal>>,
    #[serde(default = "default_contains_null")]
    pub contains_null: bool,
}

fn default_contains_null() -> bool {
    true
}

impl ColumnValueRange {
    /// Unconstrained range over `column`.
    pub fn new(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            low: None,
            high: None,
            in_list: None,
            contains_null: true,
        }
    }

    pub fn with_low(mut self, value: Literal, inclusive: bool) -> Self {
        self.low = Some(RangeBound { value, inclusive });
        self
    }

    pub fn with_high(mut self, value: Literal, inclusive: bool) -> Self {
        self.high = Some(RangeBound { value, inclusive });
        self
    }

    pub fn with_in_list(mut self, values: Vec<Literal>) -> Self {
        self.in_list = Some(values);
        self
    }

    pub fn not_null(mut self) -> Self {
        self.contains_null = false;
        self
    }

    /// True when the range admits every value, including null.
    pub fn is_full_range(&self) -> bool {
        self.low.is_none() && self.high.is_none() && self.in_list.is_none() && self.contains_null
    }

    /// Whether `value` satisfies the range. Values of a kind the bounds
    /// cannot compare against are conservatively kept.
    pub fn contains(&self, value: Option<&Literal>) -> bool {
        let Some(value) = value else {
            return self.contains_null;
        };
        if let Some(low) = &self.low {
            match value.partial_cmp_same(&low.value) {
                Some(Ordering::Less) => return false,
                Some(Ordering::Equal) if !low.inclusive => return false,
                _ => {}
            }
        }
        if let Some(high) = &self.high {
            match value.partial_cmp_same(&high.value) {
                Some(Ordering::Greater) => return false,
                Some(Ordering::Equal) if !high.inclusive => return false,
                _ => {}
            }
        }
        if let Some(list) = &self.in_list {
            return list
                .iter()
                .any(|v| v.partial_cmp_same(value) == Some(Ordering::Equal));
        }
        true
    }

    /// True when no non-null value can satisfy the bounds.
    pub fn is_empty_range(&self) -> bool {
        if let Some(list) = &self.in_list {
            if !list.iter().any(|v| self.contains(Some(v))) {
                return true;
            }
        }
        match (&self.low, &self.high) {
            (Some(low), Some(high)) => match low.value.partial_cmp_same(&high.value) {
                Some(Ordering::Greater) => true,
                Some(Ordering::Equal) => !(low.inclusive && high.inclusive),
                _ => false,
            },
            _ => false,
        }
    }
}

/// Encode a predicate map for transport across a runtime boundary.
pub fn to_json(ranges: &PredicateRanges) -> serde_json::Result<String> {
    serde_json::to_string(ranges)
}

pub fn from_json(json: &str) -> serde_json::Result<PredicateRanges> {
    serde_json::from_str(json)
}
