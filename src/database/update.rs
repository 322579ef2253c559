//! Dynamic SET-clause builder for partial updates.
//!
//! Every PUT handler collects only the fields actually present in the
//! request; the builder maps them onto parameterized clauses. Zero supplied
//! fields is a typed [`DatabaseError::NoFieldsSupplied`] condition, never
//! invalid SQL. Column names come from static allowlists in the handlers,
//! so they are safe to interpolate.

use serde_json::Value;

use crate::database::manager::DatabaseError;

#[derive(Debug, Default)]
pub struct UpdateBuilder {
    assignments: Vec<(&'static str, Value)>,
    raw_clauses: Vec<&'static str>,
}

impl UpdateBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parameterized `column = $n` assignment.
    pub fn set(&mut self, column: &'static str, value: impl Into<Value>) -> &mut Self {
        self.assignments.push((column, value.into()));
        self
    }

    /// Add a static SQL fragment, e.g. `updated_at = CURRENT_TIMESTAMP`.
    pub fn set_raw(&mut self, clause: &'static str) -> &mut Self {
        self.raw_clauses.push(clause);
        self
    }

    /// Render `UPDATE .. SET .. WHERE key_column = $n` plus its parameters
    /// (field values first, key last). Raw clauses alone do not count as an
    /// update; a timestamp touch with no supplied field is still
    /// [`DatabaseError::NoFieldsSupplied`].
    pub fn into_query(
        self,
        table: &str,
        key_column: &str,
        key: Value,
    ) -> Result<(String, Vec<Value>), DatabaseError> {
        if self.assignments.is_empty() {
            return Err(DatabaseError::NoFieldsSupplied);
        }

        let mut clauses: Vec<String> = self
            .assignments
            .iter()
            .enumerate()
            .map(|(i, (column, _))| format!("\"{}\" = ${}", column, i + 1))
            .collect();
        clauses.extend(self.raw_clauses.iter().map(|c| c.to_string()));

        let key_index = self.assignments.len() + 1;
        let sql = format!(
            "UPDATE \"{}\" SET {} WHERE \"{}\" = ${}",
            table,
            clauses.join(", "),
            key_column,
            key_index
        );

        let mut params: Vec<Value> = self.assignments.into_iter().map(|(_, v)| v).collect();
        params.push(key);
        Ok((sql, params))
    }
}
