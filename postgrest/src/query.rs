//! Rendering of [`Select`]s and filters as PostgREST query parameters.

use todolist_core::{Embed, Filter, Order, Select};

/// Query parameters for a read.
///
/// ```
/// use todolist_core::{Embed, Select};
/// use todolist_postgrest::render_query;
///
/// let select = Select::all()
///     .embed(Embed::new("owner", "users", "owner_id", &["email", "full_name"]))
///     .eq("owner_id", "user1")
///     .order("created_at", false)
///     .limit(1);
///
/// assert_eq!(
///     render_query(&select),
///     [
///         ("select".to_string(), "*,owner:owner_id(email,full_name)".to_string()),
///         ("owner_id".to_string(), "eq.user1".to_string()),
///         ("order".to_string(), "created_at.desc".to_string()),
///         ("limit".to_string(), "1".to_string()),
///     ]
/// );
/// ```
#[must_use]
pub fn render_query(select: &Select) -> Vec<(String, String)> {
    let mut params = vec![("select".to_string(), render_columns(select))];
    params.extend(render_filters(select.filters()));

    if !select.ordering().is_empty() {
        params.push(("order".to_string(), render_order(select.ordering())));
    }
    if let Some(limit) = select.row_limit() {
        params.push(("limit".to_string(), limit.to_string()));
    }
    params
}

/// Query parameters selecting rows for a write.
#[must_use]
pub fn render_filters(filters: &[Filter]) -> Vec<(String, String)> {
    filters
        .iter()
        .map(|filter| {
            (
                filter.column.clone(),
                format!("{}.{}", filter.op.as_str(), filter.value_text()),
            )
        })
        .collect()
}

fn render_columns(select: &Select) -> String {
    let mut parts = if select.projected().is_empty() {
        vec!["*".to_string()]
    } else {
        select.projected().to_vec()
    };
    parts.extend(select.embeds().iter().map(render_embed));
    parts.join(",")
}

fn render_embed(embed: &Embed) -> String {
    let columns = if embed.columns.is_empty() {
        "*".to_string()
    } else {
        embed.columns.join(",")
    };
    format!("{}:{}({columns})", embed.alias, embed.foreign_key)
}

fn render_order(order: &[Order]) -> String {
    order
        .iter()
        .map(|o| format!("{}.{}", o.column, if o.ascending { "asc" } else { "desc" }))
        .collect::<Vec<_>>()
        .join(",")
}
