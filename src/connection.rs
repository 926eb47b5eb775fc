//! DuckDB connection wrapper with lazy dataset registration and query execution.
//!
//! The order dataset is registered as a table with every column read as
//! text, plus a 1-based `row_num`. Nothing is coerced by DuckDB; typing and
//! validation happen row by row in [`RawOrderRow::parse`](crate::models::RawOrderRow::parse)
//! so failures can name the offending row.

use crate::cache::CacheManager;
use crate::config::{self, DatasetSource};
use crate::error::{DashboardError, Result};
use duckdb::{types::ValueRef, Connection as DuckDbConnection};
use serde::de::DeserializeOwned;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

/// Wraps a DuckDB connection and registers the order dataset as a table.
pub struct Connection {
    conn: DuckDbConnection,
    /// The cache manager used to download/locate remote datasets.
    pub cache: RefCell<CacheManager>,
    source: DatasetSource,
    registered_views: RefCell<HashSet<String>>,
}

impl Connection {
    /// Create a connection reading `source`, backed by the given cache.
    ///
    /// Opens an in-memory DuckDB database. The dataset itself is read on
    /// first query.
    pub fn new(cache: CacheManager, source: DatasetSource) -> Result<Self> {
        let conn = DuckDbConnection::open_in_memory()?;
        Ok(Self {
            conn,
            cache: RefCell::new(cache),
            source,
            registered_views: RefCell::new(HashSet::new()),
        })
    }

    /// Where this connection reads its dataset from.
    pub fn source(&self) -> &DatasetSource {
        &self.source
    }

    /// Ensure the `orders` table is registered, downloading data if needed.
    pub fn ensure_orders(&self) -> Result<()> {
        if self.has_view(config::ORDERS_TABLE) {
            return Ok(());
        }

        let path = match &self.source {
            DatasetSource::Path(p) => {
                if !p.exists() {
                    return Err(DashboardError::NotFound(format!(
                        "Dataset file {} does not exist",
                        p.display()
                    )));
                }
                p.clone()
            }
            DatasetSource::Url(url) => self.cache.borrow_mut().ensure_dataset(url)?,
        };

        self.register_table_from_csv(config::ORDERS_TABLE, &path.to_string_lossy())?;
        Ok(())
    }

    /// Create a DuckDB table from a CSV file with a header row.
    ///
    /// Every column is read as `VARCHAR` and a `row_num` column numbers the
    /// data rows from 1. Fails with [`DashboardError::MissingColumn`] (and
    /// drops the table again) when a required column is absent.
    pub fn register_table_from_csv(&self, table_name: &str, csv_path: &str) -> Result<()> {
        // Use forward slashes and escape quotes for the DuckDB string literal
        let path_sql = csv_path.replace('\\', "/").replace('\'', "''");
        self.conn.execute_batch(&format!(
            "DROP TABLE IF EXISTS {table}; \
             CREATE TABLE {table} AS \
             SELECT row_number() OVER () AS {row_num}, * \
             FROM read_csv('{path}', header = true, all_varchar = true)",
            table = table_name,
            row_num = config::ROW_NUM_COLUMN,
            path = path_sql
        ))?;

        let columns = self.table_columns(table_name)?;
        if let Some(missing) = config::required_columns()
            .iter()
            .find(|c| !columns.contains(**c))
        {
            self.conn
                .execute_batch(&format!("DROP TABLE IF EXISTS {}", table_name))?;
            self.registered_views.borrow_mut().remove(table_name);
            return Err(DashboardError::MissingColumn(format!(
                "{} (dataset {})",
                missing, csv_path
            )));
        }

        self.registered_views
            .borrow_mut()
            .insert(table_name.to_string());
        tracing::info!(
            table = table_name,
            path = csv_path,
            columns = columns.len(),
            "Registered dataset table"
        );
        Ok(())
    }

    /// Column names of a registered table (DESCRIBE only, no data scan).
    fn table_columns(&self, table_name: &str) -> Result<HashSet<String>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT column_name FROM (DESCRIBE {})",
            table_name
        ))?;
        let mut rows = stmt.query([])?;
        let mut columns = HashSet::new();
        while let Some(row) = rows.next()? {
            let name: String = row.get(0)?;
            columns.insert(name);
        }
        Ok(columns)
    }

    /// Execute SQL and return results as a `Vec` of `HashMap`s.
    ///
    /// Automatically converts DuckDB types to `serde_json::Value`.
    pub fn execute(
        &self,
        sql: &str,
        params: &[String],
    ) -> Result<Vec<HashMap<String, serde_json::Value>>> {
        let mut stmt = self.conn.prepare(sql)?;

        let param_values: Vec<&dyn duckdb::ToSql> = params
            .iter()
            .map(|p| p as &dyn duckdb::ToSql)
            .collect();

        let mut rows_result = stmt.query(param_values.as_slice())?;

        // Column metadata is only available once the statement has executed
        let column_names: Vec<String> = match rows_result.as_ref() {
            Some(stmt) => stmt
                .column_names()
                .into_iter()
                .map(|s| s.to_string())
                .collect(),
            None => Vec::new(),
        };

        let mut out: Vec<HashMap<String, serde_json::Value>> = Vec::new();

        while let Some(row) = rows_result.next()? {
            let mut map = HashMap::with_capacity(column_names.len());
            for (i, col_name) in column_names.iter().enumerate() {
                map.insert(col_name.clone(), convert_value_ref(row.get_ref(i)?));
            }
            out.push(map);
        }

        Ok(out)
    }

    /// Execute SQL and deserialize each row into type `T`.
    pub fn execute_into<T: DeserializeOwned>(
        &self,
        sql: &str,
        params: &[String],
    ) -> Result<Vec<T>> {
        let rows = self.execute(sql, params)?;
        let mut results = Vec::with_capacity(rows.len());
        for row in rows {
            let value = serde_json::Value::Object(row.into_iter().collect());
            results.push(serde_json::from_value(value)?);
        }
        Ok(results)
    }

    /// Execute SQL and return the first column of the first row.
    ///
    /// Returns `None` if the result set is empty.
    pub fn execute_scalar(
        &self,
        sql: &str,
        params: &[String],
    ) -> Result<Option<serde_json::Value>> {
        let mut stmt = self.conn.prepare(sql)?;
        let param_values: Vec<&dyn duckdb::ToSql> = params
            .iter()
            .map(|p| p as &dyn duckdb::ToSql)
            .collect();

        let mut rows = stmt.query(param_values.as_slice())?;

        if let Some(row) = rows.next()? {
            Ok(Some(convert_value_ref(row.get_ref(0)?)))
        } else {
            Ok(None)
        }
    }

    /// Check whether a table has been registered.
    pub fn has_view(&self, name: &str) -> bool {
        self.registered_views.borrow().contains(name)
    }

    /// Return a list of all registered table names.
    pub fn views(&self) -> Vec<String> {
        self.registered_views.borrow().iter().cloned().collect()
    }

    /// Forget registered tables so the dataset is re-read on next access.
    pub fn reset_views(&self) {
        self.registered_views.borrow_mut().clear();
    }

    /// Access the underlying DuckDB connection for advanced usage.
    pub fn raw(&self) -> &DuckDbConnection {
        &self.conn
    }
}

/// Convert a DuckDB `ValueRef` to a `serde_json::Value`.
///
/// Temporal and nested types map to `null`; queries cast them to `VARCHAR`
/// when they need them.
fn convert_value_ref(val: ValueRef<'_>) -> serde_json::Value {
    match val {
        ValueRef::Null => serde_json::Value::Null,
        ValueRef::Boolean(b) => serde_json::Value::Bool(b),
        ValueRef::TinyInt(n) => serde_json::Value::Number(n.into()),
        ValueRef::SmallInt(n) => serde_json::Value::Number(n.into()),
        ValueRef::Int(n) => serde_json::Value::Number(n.into()),
        ValueRef::BigInt(n) => serde_json::Value::Number(n.into()),
        ValueRef::UTinyInt(n) => serde_json::Value::Number(n.into()),
        ValueRef::USmallInt(n) => serde_json::Value::Number(n.into()),
        ValueRef::UInt(n) => serde_json::Value::Number(n.into()),
        ValueRef::UBigInt(n) => serde_json::Value::Number(n.into()),
        ValueRef::HugeInt(n) => match i64::try_from(n) {
            Ok(i) => serde_json::Value::Number(i.into()),
            Err(_) => serde_json::Value::String(n.to_string()),
        },
        ValueRef::Float(f) => serde_json::Number::from_f64(f as f64)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        ValueRef::Double(f) => serde_json::Number::from_f64(f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        ValueRef::Text(bytes) => {
            serde_json::Value::String(String::from_utf8_lossy(bytes).to_string())
        }
        _ => serde_json::Value::Null,
    }
}
