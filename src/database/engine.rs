//! Generic resource-CRUD engine.
//!
//! Every resource family (students, resources, assignments, topics/replies,
//! weeks) is a parameterization of the same operations: list with
//! search/sort, key lookup, existence pre-checks, parameterized insert,
//! partial update, and cascade delete of owned sub-resources inside one
//! transaction. An [`EntityDescriptor`] carries the per-family facts (table,
//! natural key, selected/searchable columns); rows travel as
//! `serde_json::Value` via Postgres `row_to_json`, so one engine serves all
//! families without per-table row structs on the read path.

use serde_json::Value;
use sqlx::{postgres::PgArguments, PgPool, Row};

use crate::database::manager::DatabaseError;
use crate::database::update::UpdateBuilder;
use crate::validate::SortSpec;

/// Static description of one resource family.
///
/// `columns` is the full projection for reads and deliberately never
/// includes secret columns; password hashes cannot leak through the engine.
#[derive(Debug, Clone, Copy)]
pub struct EntityDescriptor {
    pub table: &'static str,
    pub key_column: &'static str,
    pub columns: &'static [&'static str],
    pub searchable: &'static [&'static str],
    pub sortable: &'static [&'static str],
    pub default_sort: SortSpec,
}

/// Sub-resource owned by a parent entity (comments, replies).
#[derive(Debug, Clone, Copy)]
pub struct SubResourceDescriptor {
    pub table: &'static str,
    pub parent_column: &'static str,
    pub columns: &'static [&'static str],
}

impl EntityDescriptor {
    fn projection(&self) -> String {
        self.columns
            .iter()
            .map(|c| format!("\"{c}\""))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// List rows with an optional OR-combined search across the searchable
    /// columns and an allowlisted ORDER BY. No match is an empty list, not
    /// an error.
    pub async fn list(
        &self,
        pool: &PgPool,
        search: Option<&str>,
        sort: Option<&str>,
        order: Option<&str>,
    ) -> Result<Vec<Value>, DatabaseError> {
        let spec = SortSpec::resolve(sort, order, self.sortable, self.default_sort);
        let term = search.map(str::trim).filter(|s| !s.is_empty());

        let mut inner = format!("SELECT {} FROM \"{}\"", self.projection(), self.table);
        if term.is_some() {
            let clauses: Vec<String> = self
                .searchable
                .iter()
                .map(|c| format!("\"{c}\" ILIKE $1"))
                .collect();
            inner.push_str(&format!(" WHERE {}", clauses.join(" OR ")));
        }
        inner.push_str(&format!(
            " ORDER BY \"{}\" {}",
            spec.field,
            spec.direction.as_sql()
        ));

        let sql = format!("SELECT row_to_json(t) AS row FROM ({inner}) t");
        let mut query = sqlx::query(&sql);
        let pattern = term.map(|t| format!("%{t}%"));
        if let Some(ref pattern) = pattern {
            query = query.bind(pattern);
        }

        let rows = query.fetch_all(pool).await?;
        Ok(rows
            .into_iter()
            .filter_map(|row| row.try_get::<Value, _>("row").ok())
            .collect())
    }

    /// Look up one row by the natural key.
    pub async fn fetch_by_key(
        &self,
        pool: &PgPool,
        key: &Value,
    ) -> Result<Option<Value>, DatabaseError> {
        let sql = format!(
            "SELECT row_to_json(t) AS row FROM (SELECT {} FROM \"{}\" WHERE \"{}\" = $1 LIMIT 1) t",
            self.projection(),
            self.table,
            self.key_column
        );
        let row = bind_value(sqlx::query(&sql), key).fetch_optional(pool).await?;
        Ok(row.and_then(|r| r.try_get::<Value, _>("row").ok()))
    }

    /// Existence pre-check on the natural key.
    pub async fn exists(&self, pool: &PgPool, key: &Value) -> Result<bool, DatabaseError> {
        exists_where(pool, self.table, self.key_column, key).await
    }

    /// Partial update of the row identified by `key`. The builder already
    /// holds only the fields the caller supplied.
    pub async fn update_by_key(
        &self,
        pool: &PgPool,
        key: Value,
        builder: UpdateBuilder,
    ) -> Result<(), DatabaseError> {
        let (sql, params) = builder.into_query(self.table, self.key_column, key)?;
        let mut query = sqlx::query(&sql);
        for param in &params {
            query = bind_value(query, param);
        }
        query.execute(pool).await?;
        Ok(())
    }

    /// Hard delete with no dependents.
    pub async fn delete_by_key(&self, pool: &PgPool, key: &Value) -> Result<(), DatabaseError> {
        let sql = format!(
            "DELETE FROM \"{}\" WHERE \"{}\" = $1",
            self.table, self.key_column
        );
        bind_value(sqlx::query(&sql), key).execute(pool).await?;
        Ok(())
    }

    /// Delete the parent and every owned sub-resource atomically: children
    /// first, then the parent, in one transaction. Any failure rolls the
    /// whole unit back.
    pub async fn delete_cascade(
        &self,
        pool: &PgPool,
        sub: &SubResourceDescriptor,
        key: &Value,
    ) -> Result<(), DatabaseError> {
        let mut tx = pool.begin().await?;

        let sql = format!(
            "DELETE FROM \"{}\" WHERE \"{}\" = $1",
            sub.table, sub.parent_column
        );
        bind_value(sqlx::query(&sql), key).execute(&mut *tx).await?;

        let sql = format!(
            "DELETE FROM \"{}\" WHERE \"{}\" = $1",
            self.table, self.key_column
        );
        bind_value(sqlx::query(&sql), key).execute(&mut *tx).await?;

        tx.commit().await?;
        Ok(())
    }
}

impl SubResourceDescriptor {
    /// List sub-resources for one parent, oldest first.
    pub async fn list_for_parent(
        &self,
        pool: &PgPool,
        parent_key: &Value,
    ) -> Result<Vec<Value>, DatabaseError> {
        let projection = self
            .columns
            .iter()
            .map(|c| format!("\"{c}\""))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "SELECT row_to_json(t) AS row FROM (SELECT {} FROM \"{}\" WHERE \"{}\" = $1 ORDER BY \"created_at\" ASC) t",
            projection, self.table, self.parent_column
        );
        let rows = bind_value(sqlx::query(&sql), parent_key).fetch_all(pool).await?;
        Ok(rows
            .into_iter()
            .filter_map(|row| row.try_get::<Value, _>("row").ok())
            .collect())
    }
}

/// Parameterized INSERT from (column, value) pairs, returning the generated
/// database id.
pub async fn insert_returning_id(
    pool: &PgPool,
    table: &str,
    fields: &[(&str, Value)],
) -> Result<i64, DatabaseError> {
    let columns: Vec<String> = fields.iter().map(|(c, _)| format!("\"{c}\"")).collect();
    let placeholders: Vec<String> = (1..=fields.len()).map(|i| format!("${i}")).collect();
    let sql = format!(
        "INSERT INTO \"{}\" ({}) VALUES ({}) RETURNING id",
        table,
        columns.join(", "),
        placeholders.join(", ")
    );

    let mut query = sqlx::query(&sql);
    for (_, value) in fields {
        query = bind_value(query, value);
    }
    let row = query.fetch_one(pool).await?;
    Ok(row.try_get::<i64, _>("id")?)
}

/// `SELECT EXISTS` pre-check on an arbitrary column.
pub async fn exists_where(
    pool: &PgPool,
    table: &str,
    column: &str,
    value: &Value,
) -> Result<bool, DatabaseError> {
    let sql = format!(
        "SELECT EXISTS(SELECT 1 FROM \"{table}\" WHERE \"{column}\" = $1) AS present"
    );
    let row = bind_value(sqlx::query(&sql), value).fetch_one(pool).await?;
    Ok(row.try_get::<bool, _>("present")?)
}

/// Duplicate check that skips the row holding `key` (email change must not
/// collide with *another* entity).
pub async fn exists_where_excluding(
    pool: &PgPool,
    table: &str,
    column: &str,
    value: &Value,
    key_column: &str,
    key: &Value,
) -> Result<bool, DatabaseError> {
    let sql = format!(
        "SELECT EXISTS(SELECT 1 FROM \"{table}\" WHERE \"{column}\" = $1 AND \"{key_column}\" != $2) AS present"
    );
    let mut query = sqlx::query(&sql);
    query = bind_value(query, value);
    query = bind_value(query, key);
    let row = query.fetch_one(pool).await?;
    Ok(row.try_get::<bool, _>("present")?)
}

/// Fetch one sub-resource row by its own id (comment echo after create).
pub async fn fetch_sub_by_id(
    pool: &PgPool,
    sub: &SubResourceDescriptor,
    id: i64,
) -> Result<Option<Value>, DatabaseError> {
    let projection = sub
        .columns
        .iter()
        .map(|c| format!("\"{c}\""))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "SELECT row_to_json(t) AS row FROM (SELECT {} FROM \"{}\" WHERE id = $1 LIMIT 1) t",
        projection, sub.table
    );
    let row = sqlx::query(&sql).bind(id).fetch_optional(pool).await?;
    Ok(row.and_then(|r| r.try_get::<Value, _>("row").ok()))
}

/// Delete one sub-resource row by its own id.
pub async fn delete_sub_by_id(
    pool: &PgPool,
    sub: &SubResourceDescriptor,
    id: i64,
) -> Result<(), DatabaseError> {
    let sql = format!("DELETE FROM \"{}\" WHERE id = $1", sub.table);
    sqlx::query(&sql).bind(id).execute(pool).await?;
    Ok(())
}

/// Replace a JSON-text column (assignment `files`, week `links`) in a fetched
/// row with its decoded array; malformed or missing text becomes `[]`.
pub fn decode_json_text_field(row: &mut Value, field: &str) {
    if let Some(obj) = row.as_object_mut() {
        let decoded = obj
            .get(field)
            .and_then(Value::as_str)
            .and_then(|text| serde_json::from_str::<Value>(text).ok())
            .filter(Value::is_array)
            .unwrap_or_else(|| Value::Array(vec![]));
        obj.insert(field.to_string(), decoded);
    }
}

/// Map a `serde_json::Value` onto the right sqlx bind.
fn bind_value<'q>(
    q: sqlx::query::Query<'q, sqlx::Postgres, PgArguments>,
    v: &'q Value,
) -> sqlx::query::Query<'q, sqlx::Postgres, PgArguments> {
    match v {
        Value::Null => {
            let none: Option<String> = None;
            q.bind(none)
        }
        Value::Bool(b) => q.bind(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                q.bind(i)
            } else if let Some(f) = n.as_f64() {
                q.bind(f)
            } else {
                q.bind(n.to_string())
            }
        }
        Value::String(s) => q.bind(s.as_str()),
        // Arrays/objects are stored as JSON text columns in this schema
        other => q.bind(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decode_json_text_field_replaces_text_with_array() {
        let mut row = json!({"week_id": "week_1", "links": "[\"https://a\",\"https://b\"]"});
        decode_json_text_field(&mut row, "links");
        assert_eq!(row["links"], json!(["https://a", "https://b"]));
    }

    #[test]
    fn decode_json_text_field_tolerates_garbage() {
        let mut row = json!({"links": "not json"});
        decode_json_text_field(&mut row, "links");
        assert_eq!(row["links"], json!([]));

        let mut row = json!({"links": null});
        decode_json_text_field(&mut row, "links");
        assert_eq!(row["links"], json!([]));

        // A JSON object is not a list of links
        let mut row = json!({"links": "{\"a\":1}"});
        decode_json_text_field(&mut row, "links");
        assert_eq!(row["links"], json!([]));
    }
}
