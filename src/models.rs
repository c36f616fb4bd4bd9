use std::collections::BTreeMap;

use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct Account {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
}

/// A stored transaction joined with its account and category names.
#[derive(Debug, Clone, Serialize)]
pub struct Transaction {
    pub id: i64,
    pub date: String,
    pub payee: String,
    /// Miliunits.
    pub amount: i64,
    pub notes: Option<String>,
    pub account_id: i64,
    pub account: String,
    pub category_id: Option<i64>,
    pub category: Option<String>,
}

/// One body row after normalization, ready for bulk insert.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedRecord {
    pub amount: i64,
    pub date: Option<String>,
    pub payee: String,
    #[serde(flatten)]
    pub extra: BTreeMap<String, String>,
}

/// A row the normalizer refused, with its position in the mapped body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RejectedRow {
    pub index: usize,
    pub value: String,
    pub reason: String,
}
