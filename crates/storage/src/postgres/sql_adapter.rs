//! PostgreSQL adapter implementation.
//!
//! [`SqlAdapter`] binds one logical model to one Postgres table. It
//! implements the adapter contract for routed operations and the
//! record-source contract for the paginator, so a cursor read against
//! this adapter runs the shared windowing algorithm directly over SQL
//! counts and fetches.

use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::{PgPool, Row};
use tracing::debug;

use cenote_core::error::{
    AdapterError, AdapterErrorKind, AdapterResult, QueryError, StorageError, StorageResult,
};
use cenote_core::models::{ModelDefinition, Record, ScalarType};
use cenote_core::ports::{
    Adapter, AssociationOp, AssociationUpdate, Connection, CountResult, MutationInput, OrderItem,
    Pagination, RecordSource, Search, SearchArgument,
};
use cenote_core::services::{paginate, PaginatorConfig};

use super::database::Database;
use super::translate::{column_list, order_clause, quote_ident, where_clause, SqlValue};

/// Configuration of one SQL adapter.
#[derive(Debug, Clone)]
pub struct SqlAdapterConfig {
    /// Unique adapter name within the model's registry.
    pub adapter_name: String,
    /// Backing table name.
    pub table: String,
    /// Anchored pattern of the id-space slice this adapter owns.
    pub id_pattern: Regex,
    /// Maximum window size for unbounded reads.
    pub limit_records: u64,
}

/// PostgreSQL storage adapter for one logical model.
pub struct SqlAdapter {
    pool: PgPool,
    definition: ModelDefinition,
    config: SqlAdapterConfig,
}

impl SqlAdapter {
    pub fn new(db: &Database, definition: ModelDefinition, config: SqlAdapterConfig) -> Self {
        Self {
            pool: db.pool().clone(),
            definition,
            config,
        }
    }

    fn table(&self) -> String {
        quote_ident(&self.config.table)
    }

    fn adapter_error(&self, operation: &str, err: StorageError) -> AdapterError {
        AdapterError::new(
            &self.config.adapter_name,
            operation,
            AdapterErrorKind::Storage,
            err,
        )
    }

    fn query_error(&self, operation: &str, err: QueryError) -> AdapterError {
        let kind = match &err {
            QueryError::Storage(_) => AdapterErrorKind::Storage,
            _ => AdapterErrorKind::Validation,
        };
        AdapterError::new(&self.config.adapter_name, operation, kind, err)
    }

    /// Bind parameter for the id column, converted to its scalar type.
    fn id_param(&self, id: &str) -> StorageResult<SqlValue> {
        match self.definition.scalar_of(&self.definition.id_attribute) {
            Some(ScalarType::Int) => id.parse::<i64>().map(SqlValue::Int).map_err(|_| {
                StorageError::InvalidSearch(format!("id '{id}' is not a valid integer"))
            }),
            _ => Ok(SqlValue::Text(id.to_string())),
        }
    }

    fn row_to_record(&self, row: &PgRow) -> StorageResult<Record> {
        let mut record = Record::new();
        for attr in &self.definition.attributes {
            let name = attr.name.as_str();
            let value = match attr.scalar {
                ScalarType::String => opt_value(row, name, Value::String)?,
                ScalarType::Int => opt_value(row, name, |v: i64| Value::from(v))?,
                ScalarType::Float => opt_value(row, name, |v: f64| {
                    serde_json::Number::from_f64(v)
                        .map(Value::Number)
                        .unwrap_or(Value::Null)
                })?,
                ScalarType::Boolean => opt_value(row, name, Value::Bool)?,
                ScalarType::DateTime => {
                    opt_value(row, name, |v: chrono::DateTime<chrono::Utc>| {
                        Value::String(v.to_rfc3339())
                    })?
                }
            };
            record.set(name, value);
        }
        Ok(record)
    }

    async fn read_record(&self, id: &str) -> StorageResult<Option<Record>> {
        let sql = format!(
            "SELECT {} FROM {} WHERE {} = $1",
            column_list(&self.definition),
            self.table(),
            quote_ident(&self.definition.id_attribute),
        );
        let param = self.id_param(id)?;
        let row = bind_all(sqlx::query(&sql), std::slice::from_ref(&param))
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::QueryError(e.to_string()))?;
        row.map(|r| self.row_to_record(&r)).transpose()
    }

    /// Apply association maintenance steps after the primary write.
    ///
    /// Each step is its own statement; a failed step leaves the already
    /// committed primary write (and earlier steps) in place.
    async fn apply_associations(
        &self,
        id: &str,
        associations: &[AssociationUpdate],
    ) -> StorageResult<()> {
        for update in associations {
            let scalar = self.definition.scalar_of(&update.field).ok_or_else(|| {
                StorageError::InvalidSearch(format!(
                    "association field '{}' is not an attribute of model '{}'",
                    update.field, self.definition.name
                ))
            })?;
            let id_param = self.id_param(id)?;

            match &update.op {
                AssociationOp::Add(value) => {
                    let sql = format!(
                        "UPDATE {} SET {} = $1 WHERE {} = $2",
                        self.table(),
                        quote_ident(&update.field),
                        quote_ident(&self.definition.id_attribute),
                    );
                    let params = [SqlValue::from_json(value, scalar, &update.field)?, id_param];
                    bind_all(sqlx::query(&sql), &params)
                        .execute(&self.pool)
                        .await
                        .map_err(|e| StorageError::QueryError(e.to_string()))?;
                }
                AssociationOp::Remove(value) => {
                    // Only clear the link if it currently holds the
                    // stated value.
                    let sql = format!(
                        "UPDATE {} SET {} = NULL WHERE {} = $1 AND {} = $2",
                        self.table(),
                        quote_ident(&update.field),
                        quote_ident(&self.definition.id_attribute),
                        quote_ident(&update.field),
                    );
                    let params = [id_param, SqlValue::from_json(value, scalar, &update.field)?];
                    let result = bind_all(sqlx::query(&sql), &params)
                        .execute(&self.pool)
                        .await
                        .map_err(|e| StorageError::QueryError(e.to_string()))?;
                    if result.rows_affected() == 0 {
                        return Err(StorageError::AssociationIntegrity {
                            field: update.field.clone(),
                            value: value.to_string(),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    async fn insert(&self, values: &Record) -> StorageResult<()> {
        let (sql, params) = build_insert(&self.config.table, &self.definition, values)?;
        bind_all(sqlx::query(&sql), &params)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::QueryError(e.to_string()))?;
        Ok(())
    }

    async fn update(&self, id: &str, values: &Record) -> StorageResult<()> {
        let Some((sql, mut params)) = build_update(&self.config.table, &self.definition, values)?
        else {
            // Nothing but the id was supplied; associations may still
            // follow.
            return Ok(());
        };
        params.push(self.id_param(id)?);
        let result = bind_all(sqlx::query(&sql), &params)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::QueryError(e.to_string()))?;
        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound(id.to_string()));
        }
        Ok(())
    }
}

// =============================================================================
// RecordSource (drives the shared paginator)
// =============================================================================

#[async_trait]
impl RecordSource for SqlAdapter {
    fn definition(&self) -> &ModelDefinition {
        &self.definition
    }

    async fn count(&self, search: Option<&SearchArgument>) -> StorageResult<u64> {
        let clause = where_clause(search, &self.definition)?;
        let sql = format!(
            "SELECT COUNT(*) FROM {} {}",
            self.table(),
            clause.prefixed()
        );
        let count: i64 = bind_all_scalar(sqlx::query_scalar(&sql), &clause.params)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StorageError::QueryError(e.to_string()))?;
        Ok(count as u64)
    }

    async fn fetch(
        &self,
        search: Option<&SearchArgument>,
        order: &[OrderItem],
        offset: u64,
        limit: Option<u64>,
    ) -> StorageResult<Vec<Record>> {
        let clause = where_clause(search, &self.definition)?;
        let order_by = if order.is_empty() {
            String::new()
        } else {
            format!("ORDER BY {}", order_clause(order, &self.definition)?)
        };
        let limit_sql = match limit {
            Some(limit) => format!("LIMIT {limit}"),
            None => String::new(),
        };
        let sql = format!(
            "SELECT {} FROM {} {} {} OFFSET {offset} {}",
            column_list(&self.definition),
            self.table(),
            clause.prefixed(),
            order_by,
            limit_sql,
        );
        debug!(table = %self.config.table, "Fetching window");

        let rows = bind_all(sqlx::query(&sql), &clause.params)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::QueryError(e.to_string()))?;
        rows.iter().map(|row| self.row_to_record(row)).collect()
    }
}

// =============================================================================
// Adapter contract
// =============================================================================

#[async_trait]
impl Adapter for SqlAdapter {
    fn adapter_name(&self) -> &str {
        &self.config.adapter_name
    }

    fn definition(&self) -> &ModelDefinition {
        &self.definition
    }

    fn recognize_id(&self, id: &str) -> bool {
        self.config.id_pattern.is_match(id)
    }

    async fn count_records(&self, search: &Search) -> AdapterResult<CountResult> {
        let sum = self
            .count(search.argument.as_ref())
            .await
            .map_err(|e| self.adapter_error("countRecords", e))?;
        Ok(CountResult {
            sum,
            errors: Vec::new(),
        })
    }

    async fn read_all_cursor(
        &self,
        search: &Search,
        order: Option<&[OrderItem]>,
        pagination: Option<&Pagination>,
    ) -> AdapterResult<Connection> {
        let config = PaginatorConfig {
            limit_records: self.config.limit_records,
        };
        paginate(self, search.argument.as_ref(), order, pagination, &config)
            .await
            .map_err(|e| self.query_error("readAllCursor", e))
    }

    async fn read_by_id(&self, id: &str) -> AdapterResult<Option<Record>> {
        self.read_record(id)
            .await
            .map_err(|e| self.adapter_error("readOne", e))
    }

    async fn add_one(&self, input: &MutationInput) -> AdapterResult<Record> {
        let id = input.values.id_value(&self.definition).ok_or_else(|| {
            AdapterError::new(
                &self.config.adapter_name,
                "addOne",
                AdapterErrorKind::Validation,
                format!(
                    "input is missing the id attribute '{}'",
                    self.definition.id_attribute
                ),
            )
        })?;

        self.insert(&input.values)
            .await
            .map_err(|e| self.adapter_error("addOne", e))?;
        self.apply_associations(&id, &input.associations)
            .await
            .map_err(|e| self.adapter_error("addOne", e))?;

        self.read_record(&id)
            .await
            .map_err(|e| self.adapter_error("addOne", e))?
            .ok_or_else(|| self.adapter_error("addOne", StorageError::NotFound(id)))
    }

    async fn update_one(&self, input: &MutationInput) -> AdapterResult<Record> {
        let id = input.values.id_value(&self.definition).ok_or_else(|| {
            AdapterError::new(
                &self.config.adapter_name,
                "updateOne",
                AdapterErrorKind::Validation,
                format!(
                    "input is missing the id attribute '{}'",
                    self.definition.id_attribute
                ),
            )
        })?;

        self.update(&id, &input.values)
            .await
            .map_err(|e| self.adapter_error("updateOne", e))?;
        self.apply_associations(&id, &input.associations)
            .await
            .map_err(|e| self.adapter_error("updateOne", e))?;

        self.read_record(&id)
            .await
            .map_err(|e| self.adapter_error("updateOne", e))?
            .ok_or_else(|| self.adapter_error("updateOne", StorageError::NotFound(id)))
    }

    async fn delete_one(&self, id: &str) -> AdapterResult<()> {
        let sql = format!(
            "DELETE FROM {} WHERE {} = $1",
            self.table(),
            quote_ident(&self.definition.id_attribute),
        );
        let param = self
            .id_param(id)
            .map_err(|e| self.adapter_error("deleteOne", e))?;
        let result = bind_all(sqlx::query(&sql), std::slice::from_ref(&param))
            .execute(&self.pool)
            .await
            .map_err(|e| {
                self.adapter_error("deleteOne", StorageError::QueryError(e.to_string()))
            })?;
        if result.rows_affected() == 0 {
            return Err(self.adapter_error("deleteOne", StorageError::NotFound(id.to_string())));
        }
        Ok(())
    }
}

// =============================================================================
// SQL building helpers
// =============================================================================

fn opt_value<T>(row: &PgRow, name: &str, to_json: impl Fn(T) -> Value) -> StorageResult<Value>
where
    T: for<'r> sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
{
    let value: Option<T> = row
        .try_get(name)
        .map_err(|e| StorageError::SerializationError(format!("column '{name}': {e}")))?;
    Ok(value.map(to_json).unwrap_or(Value::Null))
}

fn bind_all<'q>(
    query: sqlx::query::Query<'q, sqlx::Postgres, PgArguments>,
    params: &'q [SqlValue],
) -> sqlx::query::Query<'q, sqlx::Postgres, PgArguments> {
    params.iter().fold(query, |query, value| match value {
        SqlValue::Text(v) => query.bind(v),
        SqlValue::Int(v) => query.bind(*v),
        SqlValue::Float(v) => query.bind(*v),
        SqlValue::Bool(v) => query.bind(*v),
        SqlValue::Timestamp(v) => query.bind(*v),
    })
}

fn bind_all_scalar<'q, O>(
    query: sqlx::query::QueryScalar<'q, sqlx::Postgres, O, PgArguments>,
    params: &'q [SqlValue],
) -> sqlx::query::QueryScalar<'q, sqlx::Postgres, O, PgArguments> {
    params.iter().fold(query, |query, value| match value {
        SqlValue::Text(v) => query.bind(v),
        SqlValue::Int(v) => query.bind(*v),
        SqlValue::Float(v) => query.bind(*v),
        SqlValue::Bool(v) => query.bind(*v),
        SqlValue::Timestamp(v) => query.bind(*v),
    })
}

/// Build a parameterized INSERT from the declared attributes present in
/// the input. Null values are omitted and fall back to column defaults.
fn build_insert(
    table: &str,
    definition: &ModelDefinition,
    values: &Record,
) -> StorageResult<(String, Vec<SqlValue>)> {
    let mut columns = Vec::new();
    let mut placeholders = Vec::new();
    let mut params = Vec::new();

    for attr in &definition.attributes {
        let Some(value) = values.get(&attr.name) else {
            continue;
        };
        if value.is_null() {
            continue;
        }
        params.push(SqlValue::from_json(value, attr.scalar, &attr.name)?);
        columns.push(quote_ident(&attr.name));
        placeholders.push(format!("${}", params.len()));
    }

    if columns.is_empty() {
        return Err(StorageError::InvalidSearch(
            "insert input carries no declared attribute values".into(),
        ));
    }

    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_ident(table),
        columns.join(", "),
        placeholders.join(", "),
    );
    Ok((sql, params))
}

/// Build a parameterized UPDATE for the non-id attributes present in the
/// input; the id bind is appended by the caller as the last placeholder.
/// Explicit nulls clear the column. Returns `None` when only the id was
/// supplied.
fn build_update(
    table: &str,
    definition: &ModelDefinition,
    values: &Record,
) -> StorageResult<Option<(String, Vec<SqlValue>)>> {
    let mut assignments = Vec::new();
    let mut params = Vec::new();

    for attr in &definition.attributes {
        if attr.name == definition.id_attribute {
            continue;
        }
        let Some(value) = values.get(&attr.name) else {
            continue;
        };
        if value.is_null() {
            assignments.push(format!("{} = NULL", quote_ident(&attr.name)));
        } else {
            params.push(SqlValue::from_json(value, attr.scalar, &attr.name)?);
            assignments.push(format!("{} = ${}", quote_ident(&attr.name), params.len()));
        }
    }

    if assignments.is_empty() {
        return Ok(None);
    }

    let sql = format!(
        "UPDATE {} SET {} WHERE {} = ${}",
        quote_ident(table),
        assignments.join(", "),
        quote_ident(&definition.id_attribute),
        params.len() + 1,
    );
    Ok(Some((sql, params)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cenote_core::models::AttributeDef;
    use serde_json::json;

    fn definition() -> ModelDefinition {
        ModelDefinition {
            name: "individual".into(),
            name_plural: "individuals".into(),
            attributes: vec![
                AttributeDef::new("name", ScalarType::String),
                AttributeDef::new("origin", ScalarType::String),
                AttributeDef::new("field_unit_id", ScalarType::String),
            ],
            id_attribute: "name".into(),
            label_attribute: "name".into(),
        }
    }

    // Test critique: l'INSERT ne couvre que les attributs déclarés et
    // fournis - les champs inconnus sont ignorés, jamais interpolés
    #[test]
    fn test_build_insert_filters_and_parameterizes() {
        let values = Record::new()
            .with("name", json!("A-001"))
            .with("origin", json!("MX"))
            .with("description", json!(null))
            .with("not_an_attribute", json!("x"));

        let (sql, params) = build_insert("individuals", &definition(), &values).unwrap();
        assert_eq!(
            sql,
            "INSERT INTO \"individuals\" (\"name\", \"origin\") VALUES ($1, $2)"
        );
        assert_eq!(
            params,
            vec![
                SqlValue::Text("A-001".into()),
                SqlValue::Text("MX".into())
            ]
        );
    }

    #[test]
    fn test_build_insert_rejects_empty_input() {
        let values = Record::new().with("unknown", json!("x"));
        assert!(build_insert("individuals", &definition(), &values).is_err());
    }

    // Test critique: un null explicite dans un update efface la
    // colonne, l'attribut id n'est jamais réassigné
    #[test]
    fn test_build_update_handles_nulls_and_skips_id() {
        let values = Record::new()
            .with("name", json!("A-001"))
            .with("origin", json!(null))
            .with("field_unit_id", json!("FU-7"));

        let (sql, params) = build_update("individuals", &definition(), &values)
            .unwrap()
            .unwrap();
        assert_eq!(
            sql,
            "UPDATE \"individuals\" SET \"origin\" = NULL, \"field_unit_id\" = $1 \
             WHERE \"name\" = $2"
        );
        assert_eq!(params, vec![SqlValue::Text("FU-7".into())]);
    }

    #[test]
    fn test_build_update_id_only_is_noop() {
        let values = Record::new().with("name", json!("A-001"));
        assert!(build_update("individuals", &definition(), &values)
            .unwrap()
            .is_none());
    }

    // Test critique: le motif d'id est ancré - le tranchage de l'espace
    // d'ids ne doit pas reposer sur une correspondance partielle
    #[test]
    fn test_id_pattern_matching() {
        let pattern = Regex::new(r"^instance1-").unwrap();
        assert!(pattern.is_match("instance1-A-001"));
        assert!(!pattern.is_match("instance2-A-001"));
        assert!(!pattern.is_match("x-instance1-A-001"));
    }
}
