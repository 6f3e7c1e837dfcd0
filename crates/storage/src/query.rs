//! Query construction shared by both backends.
//!
//! Filter values are bound through [`QueryBuilder::push_bind`], which emits the
//! placeholder syntax of the backend the builder was created for.

use crate::model::ResponseFilter;
use sqlx::database::HasArguments;
use sqlx::{Database, Encode, QueryBuilder, Type};

pub(crate) const LIST_SELECT: &str = "SELECT id, created_at, sede, dispositivo_id, \
     calificacion, motivo, meta, tipo FROM respuestas";

pub(crate) const LIST_ORDER: &str = " ORDER BY created_at DESC, id DESC";

pub(crate) const SUMMARY_SELECT: &str = "SELECT substr(created_at, 1, 10) AS dia, tipo, \
     calificacion, COUNT(*) AS n FROM respuestas";

pub(crate) const SUMMARY_GROUP: &str = " GROUP BY substr(created_at, 1, 10), tipo, calificacion \
     ORDER BY dia, tipo, calificacion";

/// Append the WHERE clause for `filter`. Dates compare against the first ten
/// characters of `created_at`, so bounds are inclusive whole days.
pub(crate) fn push_filters<'args, DB>(builder: &mut QueryBuilder<'args, DB>, filter: &ResponseFilter)
where
    DB: Database,
    String: Encode<'args, DB> + Type<DB>,
{
    builder.push(" WHERE 1=1");

    if let Some(kind) = filter.kind {
        builder.push(" AND tipo = ").push_bind(kind.as_str().to_string());
    }
    if let Some(from) = &filter.from {
        builder
            .push(" AND substr(created_at, 1, 10) >= ")
            .push_bind(from.clone());
    }
    if let Some(to) = &filter.to {
        builder
            .push(" AND substr(created_at, 1, 10) <= ")
            .push_bind(to.clone());
    }
}

/// Listing query, newest first
pub(crate) fn list_query<'args, DB>(filter: &ResponseFilter) -> QueryBuilder<'args, DB>
where
    DB: Database,
    <DB as HasArguments<'args>>::Arguments: Default,
    String: Encode<'args, DB> + Type<DB>,
{
    let mut builder = QueryBuilder::new(LIST_SELECT);
    push_filters(&mut builder, filter);
    builder.push(LIST_ORDER);
    builder
}

/// Aggregation query grouped by day, kind and rating
pub(crate) fn summary_query<'args, DB>(filter: &ResponseFilter) -> QueryBuilder<'args, DB>
where
    DB: Database,
    <DB as HasArguments<'args>>::Arguments: Default,
    String: Encode<'args, DB> + Type<DB>,
{
    let mut builder = QueryBuilder::new(SUMMARY_SELECT);
    push_filters(&mut builder, filter);
    builder.push(SUMMARY_GROUP);
    builder
}

#[cfg(test)]
mod tests {
    use super::*;
    use data_validator::Kind;
    use sqlx::{Postgres, Sqlite};

    fn full_filter() -> ResponseFilter {
        ResponseFilter {
            kind: Some(Kind::Transporte),
            from: Some("2024-01-01".to_string()),
            to: Some("2024-01-31".to_string()),
        }
    }

    #[test]
    fn test_sqlite_placeholders() {
        let builder = list_query::<Sqlite>(&full_filter());
        assert_eq!(
            builder.sql(),
            "SELECT id, created_at, sede, dispositivo_id, calificacion, motivo, meta, tipo \
             FROM respuestas WHERE 1=1 AND tipo = ? AND substr(created_at, 1, 10) >= ? \
             AND substr(created_at, 1, 10) <= ? ORDER BY created_at DESC, id DESC"
        );
    }

    #[test]
    fn test_postgres_placeholders() {
        let builder = summary_query::<Postgres>(&full_filter());
        let sql = builder.sql();
        assert!(sql.contains("tipo = $1"));
        assert!(sql.contains(">= $2"));
        assert!(sql.contains("<= $3"));
        assert!(sql.ends_with("ORDER BY dia, tipo, calificacion"));
    }

    #[test]
    fn test_empty_filter_has_no_binds() {
        let builder = list_query::<Postgres>(&ResponseFilter::default());
        assert!(!builder.sql().contains('$'));
    }
}
