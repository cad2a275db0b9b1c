//! SQL statement construction for the sales report
//!
//! Translates a [`FilterSet`] into the parameterized statement the warehouse
//! executes. Every filter value is a bound parameter; nothing from the
//! caller is ever spliced into the SQL text.

use crate::filter::{FilterSet, FilterValue};

/// The fixed projection over the sales tables. Transactions are joined to
/// franchises so location filters apply.
const BASE_QUERY: &str = "SELECT dateTime, product, quantity, unitPrice, totalPrice, \
     paymentMethod, city, country, size \
     FROM sales_transactions \
     JOIN sales_franchises ON sales_transactions.franchiseID = sales_franchises.franchiseID \
     WHERE 1=1";

/// A SQL statement plus its ordered bind parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlStatement {
    pub sql: String,
    pub params: Vec<String>,
}

/// Build the sales query for a filter set.
///
/// Present filters become conjunctive predicates (`col = ?` or
/// `col IN (?, ...)`); absent filters contribute nothing. An empty filter
/// set yields the bare select-all statement. Output is byte-identical for
/// equal filter sets since iteration order is canonical.
pub fn build_query(filters: &FilterSet) -> SqlStatement {
    let mut sql = String::from(BASE_QUERY);
    let mut params = Vec::new();

    for (field, value) in filters.iter() {
        match value {
            FilterValue::One(v) => {
                sql.push_str(&format!(" AND {} = ?", field.column()));
                params.push(v.clone());
            }
            FilterValue::AnyOf(values) => {
                let placeholders = vec!["?"; values.len()].join(", ");
                sql.push_str(&format!(" AND {} IN ({})", field.column(), placeholders));
                params.extend(values.iter().cloned());
            }
        }
    }

    SqlStatement { sql, params }
}
