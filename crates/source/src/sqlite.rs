use crate::error::{Result, SourceError};
use crate::{validate_name, TabularSource};
use async_trait::async_trait;
use reports_dataset::{Dataset, Value};
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{params_from_iter, Connection, OptionalExtension};
use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Relational mirror: one SQLite table per dataset. Columns are untyped except
/// all-boolean columns, which are declared [`BOOLEAN_TYPE`].
#[derive(Clone)]
pub struct SqliteSource {
    conn: Arc<Mutex<Connection>>,
    label: String,
}

impl SqliteSource {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            label: format!("sqlite:{}", path.display()),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(Self {
            conn: Arc::new(Mutex::new(Connection::open_in_memory()?)),
            label: "sqlite::memory:".to_string(),
        })
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn
                .lock()
                .map_err(|_| SourceError::Other("sqlite connection mutex poisoned".to_string()))?;
            f(&mut guard)
        })
        .await
        .map_err(|err| SourceError::Other(format!("sqlite task failed: {err}")))?
    }
}

const BOOLEAN_TYPE: &str = "BOOLEAN";

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn table_exists(conn: &Connection, name: &str) -> Result<bool> {
    Ok(conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [name],
            |_| Ok(()),
        )
        .optional()?
        .is_some())
}

fn to_sql(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(v) => SqlValue::Integer(i64::from(*v)),
        Value::Int(v) => SqlValue::Integer(*v),
        Value::Float(v) => SqlValue::Real(*v),
        Value::Text(s) => SqlValue::Text(s.clone()),
        Value::Date(_) | Value::DateTime(_) => SqlValue::Text(value.to_string()),
    }
}

fn from_sql(value: ValueRef<'_>, boolean: bool) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(v) if boolean => Value::Bool(v != 0),
        ValueRef::Integer(v) => Value::Int(v),
        ValueRef::Real(v) => Value::Float(v),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            Value::Text(String::from_utf8_lossy(bytes).into_owned())
        }
    }
}

/// Declared types of `name`'s columns, in table order.
fn declared_types(conn: &Connection, name: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", quote_ident(name)))?;
    let types = stmt
        .query_map([], |row| row.get::<_, String>(2))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(types)
}

fn read_table(conn: &Connection, name: &str) -> Result<Dataset> {
    if !table_exists(conn, name)? {
        return Err(SourceError::NotFound(name.to_string()));
    }
    let boolean: Vec<bool> = declared_types(conn, name)?
        .iter()
        .map(|t| t.eq_ignore_ascii_case(BOOLEAN_TYPE))
        .collect();
    let mut stmt = conn.prepare(&format!("SELECT * FROM {}", quote_ident(name)))?;
    let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
    let width = columns.len();
    let mut dataset = Dataset::new(columns)?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let cells = (0..width)
            .map(|i| {
                let is_bool = boolean.get(i).copied().unwrap_or(false);
                row.get_ref(i).map(|v| from_sql(v, is_bool))
            })
            .collect::<rusqlite::Result<Vec<_>>>()?;
        dataset.push_row(cells)?;
    }
    Ok(dataset)
}

/// SQLite compares column names case-insensitively, so a later spelling that
/// collides with an earlier one gets a `_2`, `_3`, ... suffix.
fn sql_column_names(columns: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    columns
        .iter()
        .map(|name| {
            let mut candidate = name.clone();
            let mut suffix = 2;
            while !seen.insert(candidate.to_ascii_lowercase()) {
                candidate = format!("{name}_{suffix}");
                suffix += 1;
            }
            if candidate != *name {
                log::warn!("Column {name} collides with another spelling; stored as {candidate}");
            }
            candidate
        })
        .collect()
}

/// True when the column holds at least one boolean and nothing but booleans
/// and nulls.
fn is_boolean_column(dataset: &Dataset, idx: usize) -> bool {
    let mut cells = dataset
        .rows()
        .map(|row| &row.cells()[idx])
        .filter(|v| !matches!(v, Value::Null))
        .peekable();
    cells.peek().is_some() && cells.all(|v| matches!(v, Value::Bool(_)))
}

/// Drops and recreates `name` inside one transaction, so readers see either the
/// previous table or the complete new one.
fn replace_table(conn: &mut Connection, dataset: &Dataset, name: &str) -> Result<()> {
    if dataset.columns().is_empty() {
        return Err(SourceError::Other(format!(
            "refusing to create table {name} without columns"
        )));
    }
    let table = quote_ident(name);
    let names = sql_column_names(dataset.columns());
    let definitions = names
        .iter()
        .enumerate()
        .map(|(idx, c)| {
            if is_boolean_column(dataset, idx) {
                format!("{} {BOOLEAN_TYPE}", quote_ident(c))
            } else {
                quote_ident(c)
            }
        })
        .collect::<Vec<_>>()
        .join(", ");
    let column_list = names
        .iter()
        .map(|c| quote_ident(c))
        .collect::<Vec<_>>()
        .join(", ");
    let placeholders = (1..=dataset.columns().len())
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(", ");

    let tx = conn.transaction()?;
    tx.execute(&format!("DROP TABLE IF EXISTS {table}"), [])?;
    tx.execute(&format!("CREATE TABLE {table} ({definitions})"), [])?;
    {
        let mut insert =
            tx.prepare(&format!("INSERT INTO {table} ({column_list}) VALUES ({placeholders})"))?;
        for row in dataset.rows() {
            insert.execute(params_from_iter(row.cells().iter().map(to_sql)))?;
        }
    }
    tx.commit()?;
    Ok(())
}

#[async_trait]
impl TabularSource for SqliteSource {
    fn describe(&self) -> String {
        self.label.clone()
    }

    async fn read_dataset(&self, name: &str) -> Result<Dataset> {
        validate_name(name)?;
        let table = name.to_string();
        let dataset = self.with_conn(move |conn| read_table(conn, &table)).await?;
        log::info!(
            "[{}] Read {} rows from {name}",
            self.label,
            dataset.len()
        );
        Ok(dataset)
    }

    async fn write_dataset(&self, dataset: &Dataset, name: &str) -> Result<()> {
        validate_name(name)?;
        let table = name.to_string();
        let dataset = dataset.clone();
        let rows = dataset.len();
        self.with_conn(move |conn| replace_table(conn, &dataset, &table))
            .await?;
        log::info!("[{}] Wrote {rows} rows to {name}", self.label);
        Ok(())
    }

    async fn exists(&self, name: &str) -> Result<bool> {
        validate_name(name)?;
        let table = name.to_string();
        self.with_conn(move |conn| table_exists(conn, &table)).await
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let prefix = prefix.to_string();
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name",
            )?;
            let names = stmt
                .query_map([], |row| row.get::<_, String>(0))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(names
                .into_iter()
                .filter(|name| name.starts_with(&prefix))
                .collect())
        })
        .await
    }

    async fn ping(&self) -> Result<()> {
        self.with_conn(|conn| {
            conn.query_row("SELECT 1", [], |_| Ok(()))?;
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> Dataset {
        Dataset::from_rows(
            vec!["VM".into(), "CPUs".into(), "Location \"main\"".into()],
            vec![
                vec![Value::text("vm-a"), Value::Int(4), Value::text("ams")],
                vec![Value::text("vm-b"), Value::Null, Value::text("ber")],
            ],
        )
        .unwrap()
    }

    #[tokio::test]
    async fn replace_and_read_back() {
        let source = SqliteSource::open_in_memory().unwrap();
        source.write_dataset(&sample(), "rvtools_vinfo").await.unwrap();

        let read = source.read_dataset("rvtools_vinfo").await.unwrap();
        assert_eq!(read, sample());
        assert!(source.exists("rvtools_vinfo").await.unwrap());
        assert_eq!(source.list("rv").await.unwrap(), vec!["rvtools_vinfo".to_string()]);
    }

    #[tokio::test]
    async fn replace_discards_previous_rows() {
        let source = SqliteSource::open_in_memory().unwrap();
        source.write_dataset(&sample(), "t").await.unwrap();
        let smaller = Dataset::from_rows(vec!["x".into()], vec![vec![Value::Int(1)]]).unwrap();
        source.write_dataset(&smaller, "t").await.unwrap();

        assert_eq!(source.read_dataset("t").await.unwrap(), smaller);
    }

    #[tokio::test]
    async fn booleans_read_back_as_booleans() {
        let source = SqliteSource::open_in_memory().unwrap();
        let flags = Dataset::from_rows(
            vec!["VM".into(), "Powered On".into(), "CPUs".into()],
            vec![
                vec![Value::text("vm-a"), Value::Bool(true), Value::Int(1)],
                vec![Value::text("vm-b"), Value::Null, Value::Int(0)],
                vec![Value::text("vm-c"), Value::Bool(false), Value::Int(2)],
            ],
        )
        .unwrap();
        source.write_dataset(&flags, "flags").await.unwrap();

        assert_eq!(source.read_dataset("flags").await.unwrap(), flags);
    }

    #[tokio::test]
    async fn case_variant_columns_are_kept_apart() {
        let source = SqliteSource::open_in_memory().unwrap();
        let both = Dataset::from_rows(
            vec!["Location".into(), "location".into(), "LOCATION".into()],
            vec![vec![Value::text("ams"), Value::text("ber"), Value::text("osl")]],
        )
        .unwrap();
        source.write_dataset(&both, "sites").await.unwrap();

        let read = source.read_dataset("sites").await.unwrap();
        assert_eq!(read.columns(), ["Location", "location_2", "LOCATION_3"]);
        assert_eq!(read.row(0).unwrap().cells(), both.row(0).unwrap().cells());
    }

    #[tokio::test]
    async fn missing_table_is_not_found() {
        let source = SqliteSource::open_in_memory().unwrap();
        assert!(source.read_dataset("nope").await.unwrap_err().is_not_found());
        source.ping().await.unwrap();
    }
}
