//! Read queries.
//!
//! A [`Select`] describes what a read wants: projected columns, embedded
//! relations, filters, ordering and a row limit. Services build one and
//! callers refine it through shape functions (`FnOnce(Select) -> Select`).
//! Backends decide how to execute it.

use serde_json::{Map, Value};
use std::cmp::Ordering;

/// Comparison operator of a [`Filter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterOp {
    /// Equal
    Eq,
    /// Not equal
    Neq,
    /// Greater than
    Gt,
    /// Greater than or equal
    Gte,
    /// Less than
    Lt,
    /// Less than or equal
    Lte,
}

impl FilterOp {
    /// Operator keyword as used in query strings (`eq`, `gte`, ...).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Neq => "neq",
            Self::Gt => "gt",
            Self::Gte => "gte",
            Self::Lt => "lt",
            Self::Lte => "lte",
        }
    }

    const fn accepts(self, ordering: Ordering) -> bool {
        match self {
            Self::Eq => ordering.is_eq(),
            Self::Neq => ordering.is_ne(),
            Self::Gt => ordering.is_gt(),
            Self::Gte => ordering.is_ge(),
            Self::Lt => ordering.is_lt(),
            Self::Lte => ordering.is_le(),
        }
    }
}

/// Single column predicate.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    /// Column name
    pub column: String,
    /// Operator
    pub op: FilterOp,
    /// Right-hand side
    pub value: Value,
}

impl Filter {
    /// Build a predicate.
    #[must_use]
    pub fn new(column: impl Into<String>, op: FilterOp, value: impl Into<Value>) -> Self {
        Self {
            column: column.into(),
            op,
            value: value.into(),
        }
    }

    /// Shorthand for an equality predicate.
    #[must_use]
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(column, FilterOp::Eq, value)
    }

    /// Right-hand side rendered as plain text (strings unquoted).
    #[must_use]
    pub fn value_text(&self) -> String {
        match &self.value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }

    /// Evaluate the predicate against a row.
    ///
    /// A missing column compares as `null`. Values of different JSON types
    /// only satisfy `neq`.
    #[must_use]
    pub fn matches(&self, row: &Map<String, Value>) -> bool {
        let left = row.get(&self.column).unwrap_or(&Value::Null);
        compare_values(left, &self.value).map_or(self.op == FilterOp::Neq, |ordering| {
            self.op.accepts(ordering)
        })
    }
}

/// Order JSON scalars of the same type. Strings compare lexicographically,
/// which orders RFC 3339 timestamps chronologically.
#[must_use]
pub fn compare_values(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

/// Ordering clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    /// Column to order by
    pub column: String,
    /// Ascending when true
    pub ascending: bool,
}

/// Embedded relation: rows of `table` whose primary key equals this row's
/// `foreign_key`, projected to `columns` and exposed under `alias`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Embed {
    /// Field name in the result row
    pub alias: String,
    /// Related table
    pub table: String,
    /// Column of this table referencing the related row
    pub foreign_key: String,
    /// Projected columns of the related row
    pub columns: Vec<String>,
}

impl Embed {
    /// Build an embed.
    #[must_use]
    pub fn new(
        alias: impl Into<String>,
        table: impl Into<String>,
        foreign_key: impl Into<String>,
        columns: &[&str],
    ) -> Self {
        Self {
            alias: alias.into(),
            table: table.into(),
            foreign_key: foreign_key.into(),
            columns: columns.iter().map(ToString::to_string).collect(),
        }
    }
}

/// Read query.
///
/// # Example
///
/// ```
/// use todolist_core::Select;
///
/// let select = Select::all()
///     .eq("owner_id", "user1")
///     .order("created_at", false)
///     .limit(10);
/// assert_eq!(select.filters().len(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Select {
    columns: Vec<String>,
    embeds: Vec<Embed>,
    filters: Vec<Filter>,
    order: Vec<Order>,
    limit: Option<usize>,
}

impl Select {
    /// Every column, no filter.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Restrict the projected columns.
    #[must_use]
    pub fn columns(mut self, columns: &[&str]) -> Self {
        self.columns = columns.iter().map(ToString::to_string).collect();
        self
    }

    /// Add an embedded relation.
    #[must_use]
    pub fn embed(mut self, embed: Embed) -> Self {
        self.embeds.push(embed);
        self
    }

    /// Add a predicate.
    #[must_use]
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Add an equality predicate.
    #[must_use]
    pub fn eq(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter(Filter::eq(column, value))
    }

    /// Add an inequality predicate.
    #[must_use]
    pub fn neq(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter(Filter::new(column, FilterOp::Neq, value))
    }

    /// Add a `>` predicate.
    #[must_use]
    pub fn gt(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter(Filter::new(column, FilterOp::Gt, value))
    }

    /// Add a `>=` predicate.
    #[must_use]
    pub fn gte(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter(Filter::new(column, FilterOp::Gte, value))
    }

    /// Add a `<` predicate.
    #[must_use]
    pub fn lt(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter(Filter::new(column, FilterOp::Lt, value))
    }

    /// Add a `<=` predicate.
    #[must_use]
    pub fn lte(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter(Filter::new(column, FilterOp::Lte, value))
    }

    /// Append an ordering clause. Earlier clauses take precedence.
    #[must_use]
    pub fn order(mut self, column: impl Into<String>, ascending: bool) -> Self {
        self.order.push(Order {
            column: column.into(),
            ascending,
        });
        self
    }

    /// Cap the number of returned rows.
    #[must_use]
    pub const fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Projected columns; empty means all.
    #[must_use]
    pub fn projected(&self) -> &[String] {
        &self.columns
    }

    /// Embedded relations.
    #[must_use]
    pub fn embeds(&self) -> &[Embed] {
        &self.embeds
    }

    /// Predicates, all of which must hold.
    #[must_use]
    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    /// Ordering clauses.
    #[must_use]
    pub fn ordering(&self) -> &[Order] {
        &self.order
    }

    /// Row limit.
    #[must_use]
    pub const fn row_limit(&self) -> Option<usize> {
        self.limit
    }
}
