//! Translation of [`SearchFilter`] into a LanceDB SQL predicate.

use chatrag_core::error::Result;
use chatrag_core::filter::SearchFilter;

/// `None` for an empty filter. Rejects non-finite bounds before they reach
/// the SQL layer.
pub fn to_predicate(filter: &SearchFilter) -> Result<Option<String>> {
    filter.validate()?;
    let mut clauses = Vec::new();
    if let Some(a) = filter.author_id { clauses.push(format!("author_id = {a}")); }
    if let Some(c) = filter.chat_id { clauses.push(format!("chat_id = {c}")); }
    if let Some(s) = filter.since { clauses.push(format!("timestamp >= {s:?}")); }
    if let Some(u) = filter.until { clauses.push(format!("timestamp <= {u:?}")); }
    if clauses.is_empty() { Ok(None) } else { Ok(Some(clauses.join(" AND "))) }
}

pub fn quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}
