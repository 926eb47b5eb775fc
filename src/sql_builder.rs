//! SQL builder with parameterized query construction.
//!
//! All caller-supplied values go through DuckDB's parameter binding (`?`
//! placeholders), never through string interpolation. Builder methods return
//! `&mut Self` for chaining.
//!
//! # Example
//!
//! ```rust
//! use order_dashboard::SqlBuilder;
//! let (sql, params) = SqlBuilder::new("orders")
//!     .select(&["order_id", "price"])
//!     .where_not_null("payment_type")
//!     .order_by(&["row_num ASC"])
//!     .build();
//! assert!(sql.contains("WHERE payment_type IS NOT NULL"));
//! assert!(params.is_empty());
//! ```

use crate::models::DateRange;

/// Builds parameterized SQL queries over the dataset table.
pub struct SqlBuilder {
    select_cols: Vec<String>,
    is_distinct: bool,
    from_table: String,
    where_clauses: Vec<String>,
    params: Vec<String>,
    order_by_cols: Vec<String>,
}

impl SqlBuilder {
    /// Create a builder targeting the given table or view.
    pub fn new(table: &str) -> Self {
        Self {
            select_cols: vec!["*".to_string()],
            is_distinct: false,
            from_table: table.to_string(),
            where_clauses: Vec::new(),
            params: Vec::new(),
            order_by_cols: Vec::new(),
        }
    }

    /// Set the columns to select (replaces the default `*`).
    pub fn select(&mut self, cols: &[&str]) -> &mut Self {
        self.select_cols = cols.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn distinct(&mut self) -> &mut Self {
        self.is_distinct = true;
        self
    }

    pub fn where_not_null(&mut self, column: &str) -> &mut Self {
        self.where_clauses.push(format!("{} IS NOT NULL", column));
        self
    }

    /// Keep rows whose text timestamp column falls inside `range`.
    ///
    /// Compares half-open against the day after `range.end`, so the whole end
    /// day is included. Rows whose timestamp does not cast are excluded;
    /// callers that must not lose them validate first.
    pub fn where_date_range(&mut self, column: &str, range: &DateRange) -> &mut Self {
        self.where_clauses.push(format!(
            "TRY_CAST({col} AS TIMESTAMP) >= CAST(? AS TIMESTAMP) \
             AND TRY_CAST({col} AS TIMESTAMP) < CAST(? AS TIMESTAMP)",
            col = column
        ));
        self.params.push(range.start.format("%Y-%m-%d").to_string());
        self.params
            .push(range.end_exclusive().format("%Y-%m-%d").to_string());
        self
    }

    /// Add ORDER BY clauses (e.g. `"row_num ASC"`).
    pub fn order_by(&mut self, clauses: &[&str]) -> &mut Self {
        self.order_by_cols
            .extend(clauses.iter().map(|c| c.to_string()));
        self
    }

    /// Build the final SQL string and parameter list.
    pub fn build(&self) -> (String, Vec<String>) {
        let distinct = if self.is_distinct { "DISTINCT " } else { "" };
        let mut parts = vec![
            format!("SELECT {}{}", distinct, self.select_cols.join(", ")),
            format!("FROM {}", self.from_table),
        ];

        if !self.where_clauses.is_empty() {
            parts.push(format!("WHERE {}", self.where_clauses.join(" AND ")));
        }

        if !self.order_by_cols.is_empty() {
            parts.push(format!("ORDER BY {}", self.order_by_cols.join(", ")));
        }

        (parts.join("\n"), self.params.clone())
    }
}
