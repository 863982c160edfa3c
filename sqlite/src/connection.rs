//! [`Storage`] over a rusqlite connection.

use std::sync::atomic::{AtomicU32, Ordering};

use drizzle_graphql_core::model::Column;
use drizzle_graphql_core::{
    CountQuery, DeletePlan, GeneratorError, InsertPlan, MutationOutput, Result, Row, SchemaDef,
    SelectPlan, Storage, UpdatePlan, gql_trace_query, gql_trace_tx,
};
use rusqlite::params_from_iter;

use crate::builder;
use crate::rows::{Field, fields};
use crate::sql::SQL;
use crate::values::{SQLiteValue, decode};

/// SQLite transaction types
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SQLiteTransactionType {
    #[default]
    /// A deferred transaction is the default - it does not acquire locks until needed
    Deferred,
    /// An immediate transaction acquires a RESERVED lock immediately
    Immediate,
    /// An exclusive transaction acquires an EXCLUSIVE lock immediately
    Exclusive,
}

impl SQLiteTransactionType {
    const fn begin(self) -> &'static str {
        match self {
            SQLiteTransactionType::Deferred => "BEGIN DEFERRED",
            SQLiteTransactionType::Immediate => "BEGIN IMMEDIATE",
            SQLiteTransactionType::Exclusive => "BEGIN EXCLUSIVE",
        }
    }
}

/// Runs generator plans on a rusqlite [`rusqlite::Connection`].
///
/// [`Storage::transaction`] opens a real transaction when the connection is
/// in autocommit mode and a savepoint otherwise, so calls nest, including
/// inside a transaction the caller opened on the connection.
#[derive(Debug)]
pub struct SQLiteStorage {
    conn: rusqlite::Connection,
    tx_type: SQLiteTransactionType,
    savepoint_depth: AtomicU32,
}

impl SQLiteStorage {
    pub fn new(conn: rusqlite::Connection) -> Self {
        Self {
            conn,
            tx_type: SQLiteTransactionType::default(),
            savepoint_depth: AtomicU32::new(0),
        }
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(Self::new(rusqlite::Connection::open_in_memory()?))
    }

    /// Locking mode of transactions this storage begins itself.
    #[must_use]
    pub fn with_transaction_type(mut self, tx_type: SQLiteTransactionType) -> Self {
        self.tx_type = tx_type;
        self
    }

    #[inline]
    pub fn conn(&self) -> &rusqlite::Connection {
        &self.conn
    }

    pub fn into_inner(self) -> rusqlite::Connection {
        self.conn
    }

    /// Reads tables, columns and foreign-key relations from the catalog.
    pub fn introspect(&self) -> Result<SchemaDef> {
        crate::introspect::introspect(&self.conn)
    }

    fn execute_raw(&self, sql: &str) -> rusqlite::Result<()> {
        self.conn.execute(sql, [])?;
        Ok(())
    }

    fn query<F>(&self, sql: &SQL<'_>, mut read: F) -> Result<Vec<Row>>
    where
        F: FnMut(&rusqlite::Row<'_>) -> Result<Row>,
    {
        let (text, params) = sql.build();
        gql_trace_query!(&text, params.len());
        let mut stmt = self.conn.prepare_cached(&text)?;
        let mut rows = stmt.query(params_from_iter(params))?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            out.push(read(row)?);
        }
        Ok(out)
    }

    fn write(&self, sql: &SQL<'_>, returning: Option<&[Column]>) -> Result<MutationOutput> {
        let Some(columns) = returning else {
            let (text, params) = sql.build();
            gql_trace_query!(&text, params.len());
            let mut stmt = self.conn.prepare_cached(&text)?;
            let affected = stmt.execute(params_from_iter(params))?;
            return Ok(MutationOutput {
                affected,
                rows: Vec::new(),
            });
        };
        let rows = self.query(sql, |row| returned_row(columns, row))?;
        Ok(MutationOutput {
            affected: rows.len(),
            rows,
        })
    }
}

fn returned_row(columns: &[Column], row: &rusqlite::Row<'_>) -> Result<Row> {
    let mut out = Row::new();
    for (i, column) in columns.iter().enumerate() {
        let value = SQLiteValue::from(row.get_ref(i)?);
        out.insert(column.name.clone(), decode(column.column_type, value)?);
    }
    Ok(out)
}

fn selected_row(fields: &[Field<'_>], row: &rusqlite::Row<'_>) -> Result<Row> {
    let mut out = Row::new();
    for (i, field) in fields.iter().enumerate() {
        let value = SQLiteValue::from(row.get_ref(i)?);
        out.insert(field.name().to_string(), field.decode(value)?);
    }
    Ok(out)
}

impl Storage for SQLiteStorage {
    fn select(&self, plan: &SelectPlan) -> Result<Vec<Row>> {
        let sql = builder::select(plan);
        let fields = fields(plan);
        self.query(&sql, |row| selected_row(&fields, row))
    }

    fn count(&self, query: &CountQuery) -> Result<u64> {
        let sql = builder::count(query);
        let (text, params) = sql.build();
        gql_trace_query!(&text, params.len());
        let mut stmt = self.conn.prepare_cached(&text)?;
        let count: i64 = stmt.query_row(params_from_iter(params), |row| row.get(0))?;
        u64::try_from(count).map_err(|e| GeneratorError::Mapping(e.to_string()))
    }

    fn insert(&self, plan: &InsertPlan) -> Result<MutationOutput> {
        let mut output = MutationOutput::default();
        for sql in builder::insert(plan) {
            let part = self.write(&sql, plan.returning.as_deref())?;
            output.affected += part.affected;
            output.rows.extend(part.rows);
        }
        Ok(output)
    }

    fn update(&self, plan: &UpdatePlan) -> Result<MutationOutput> {
        if plan.values.is_empty() {
            return Err(GeneratorError::InvalidArgument(format!(
                "update of {} sets no columns",
                plan.table
            )));
        }
        self.write(&builder::update(plan), plan.returning.as_deref())
    }

    fn delete(&self, plan: &DeletePlan) -> Result<MutationOutput> {
        self.write(&builder::delete(plan), plan.returning.as_deref())
    }

    /// Commits when `f` returns `Ok`; rolls back when it returns `Err` or
    /// panics, then returns the error or resumes the panic.
    fn transaction(&self, f: &mut dyn FnMut(&dyn Storage) -> Result<()>) -> Result<()> {
        let depth = self.savepoint_depth.load(Ordering::Relaxed);
        let outermost = depth == 0 && self.conn.is_autocommit();
        let sp_name = format!("gql_sp_{depth}");

        let (begin, commit, rollback) = if outermost {
            (
                self.tx_type.begin().to_string(),
                "COMMIT".to_string(),
                vec!["ROLLBACK".to_string()],
            )
        } else {
            (
                format!("SAVEPOINT {sp_name}"),
                format!("RELEASE SAVEPOINT {sp_name}"),
                vec![
                    format!("ROLLBACK TO SAVEPOINT {sp_name}"),
                    format!("RELEASE SAVEPOINT {sp_name}"),
                ],
            )
        };

        gql_trace_tx!("begin", "sqlite.rusqlite");
        self.execute_raw(&begin)?;
        self.savepoint_depth.store(depth + 1, Ordering::Relaxed);

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| f(self)));

        self.savepoint_depth.store(depth, Ordering::Relaxed);

        match result {
            Ok(Ok(())) => {
                if let Err(e) = self.execute_raw(&commit) {
                    for sql in &rollback {
                        let _ = self.execute_raw(sql);
                    }
                    return Err(GeneratorError::TransactionError(e.to_string()));
                }
                gql_trace_tx!("commit", "sqlite.rusqlite");
                Ok(())
            }
            Ok(Err(e)) => {
                for sql in &rollback {
                    let _ = self.execute_raw(sql);
                }
                gql_trace_tx!("rollback", "sqlite.rusqlite");
                Err(e)
            }
            Err(panic_payload) => {
                for sql in &rollback {
                    let _ = self.execute_raw(sql);
                }
                gql_trace_tx!("rollback", "sqlite.rusqlite");
                std::panic::resume_unwind(panic_payload);
            }
        }
    }
}
