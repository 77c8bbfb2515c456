//! CTE query builder
//!
//! Every transformation stage is a named relation. Stages attach themselves
//! to a [`QueryBuilder`] as common table expressions, and a retrieval finishes
//! the builder with a single `SELECT`. Values are always bound as positional
//! `?` parameters; only validated identifiers and closed-enum keywords are
//! written into the query text.

use duckdb::types::Value;

#[derive(Debug, Clone)]
struct Cte {
    name: String,
    sql: String,
}

/// Accumulates named relations and their bound parameters in text order
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    ctes: Vec<Cte>,
    params: Vec<Value>,
}

impl QueryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a relation without parameters
    pub fn with(self, name: &str, sql: impl Into<String>) -> Self {
        self.with_params(name, sql, Vec::new())
    }

    /// Attach a relation together with the values bound by its placeholders
    ///
    /// A relation that is already attached is kept as is, so shared stages
    /// can be requested by several callers in one query.
    pub fn with_params(
        mut self,
        name: &str,
        sql: impl Into<String>,
        params: impl IntoIterator<Item = Value>,
    ) -> Self {
        if self.contains(name) {
            return self;
        }

        self.ctes.push(Cte {
            name: name.to_string(),
            sql: sql.into(),
        });
        self.params.extend(params);
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.ctes.iter().any(|cte| cte.name == name)
    }

    /// Finish with the final statement
    pub fn select(self, sql: impl Into<String>) -> Query {
        self.select_with_params(sql, Vec::new())
    }

    pub fn select_with_params(
        self,
        sql: impl Into<String>,
        params: impl IntoIterator<Item = Value>,
    ) -> Query {
        let mut text = String::new();

        if !self.ctes.is_empty() {
            text.push_str("WITH\n");
            let body: Vec<String> = self
                .ctes
                .iter()
                .map(|cte| format!("{} AS (\n{}\n)", cte.name, cte.sql.trim()))
                .collect();
            text.push_str(&body.join(",\n"));
            text.push('\n');
        }
        text.push_str(sql.into().trim());

        let mut all_params = self.params;
        all_params.extend(params);

        Query {
            sql: text,
            params: all_params,
        }
    }
}

/// A finished statement ready for execution
#[derive(Debug, Clone)]
pub struct Query {
    sql: String,
    params: Vec<Value>,
}

impl Query {
    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn params(&self) -> &[Value] {
        &self.params
    }
}

/// Bind a text value
pub fn text(value: impl Into<String>) -> Value {
    Value::Text(value.into())
}

/// Bind a floating point value
pub fn double(value: f64) -> Value {
    Value::Double(value)
}

/// `(?), (?), ...` placeholders for a single-column VALUES list
pub fn values_placeholders(count: usize, cast: &str) -> String {
    vec![format!("(?::{})", cast); count].join(", ")
}

/// Offset/limit page over an ordered result
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Pagination {
    pub offset: u64,
    /// `None` returns every remaining row
    pub limit: Option<u64>,
}

impl Pagination {
    pub fn new(offset: u64, limit: Option<u64>) -> Self {
        Self { offset, limit }
    }

    /// `LIMIT`/`OFFSET` tail; typed integers, so written inline
    pub fn clause(&self) -> String {
        let mut clause = String::new();
        if let Some(limit) = self.limit {
            clause.push_str(&format!(" LIMIT {}", limit));
        }
        if self.offset > 0 {
            clause.push_str(&format!(" OFFSET {}", self.offset));
        }
        clause
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_select() {
        let query = QueryBuilder::new().select("SELECT 1");
        assert_eq!(query.sql(), "SELECT 1");
        assert!(query.params().is_empty());
    }

    #[test]
    fn test_ctes_render_in_order_with_params() {
        let query = QueryBuilder::new()
            .with_params("a", "SELECT ? AS x", vec![text("first")])
            .with("b", "SELECT x FROM a")
            .select_with_params("SELECT * FROM b WHERE x = ?", vec![text("second")]);

        assert_eq!(
            query.sql(),
            "WITH\na AS (\nSELECT ? AS x\n),\nb AS (\nSELECT x FROM a\n)\nSELECT * FROM b WHERE x = ?"
        );
        assert_eq!(query.params(), &[text("first"), text("second")]);
    }

    #[test]
    fn test_shared_relation_attached_once() {
        let query = QueryBuilder::new()
            .with_params("a", "SELECT ?", vec![text("kept")])
            .with_params("a", "SELECT ?", vec![text("dropped")])
            .select("SELECT * FROM a");

        assert_eq!(query.sql().matches("a AS (").count(), 1);
        assert_eq!(query.params(), &[text("kept")]);
    }

    #[test]
    fn test_values_placeholders() {
        assert_eq!(values_placeholders(2, "VARCHAR"), "(?::VARCHAR), (?::VARCHAR)");
        assert_eq!(values_placeholders(0, "VARCHAR"), "");
    }

    #[test]
    fn test_pagination_clause() {
        assert_eq!(Pagination::default().clause(), "");
        assert_eq!(Pagination::new(0, Some(10)).clause(), " LIMIT 10");
        assert_eq!(Pagination::new(20, Some(10)).clause(), " LIMIT 10 OFFSET 20");
        assert_eq!(Pagination::new(5, None).clause(), " OFFSET 5");
    }
}
