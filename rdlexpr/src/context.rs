//! Evaluation state threaded through every evaluator call.
//!
//! [`ReportContext`] lives for a whole render job and may be read by many
//! workers at once; its mutable parts (aggregates, page cursor, cancellation)
//! are synchronized. Row state is reached through [`RowAccess`] and is never
//! shared between workers.
use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU32, Ordering},
    },
    time::{Duration, Instant},
};

use chrono::{Local, NaiveDateTime};
use parking_lot::RwLock;

use crate::{
    error::{Error, Result},
    expr::{Expr, reference::FieldRef},
    kind::ValueKind,
    value::Value,
};

/// Read access to the fields of the current record.
///
/// Implemented by [`Row`]; the render driver or a test may provide its own
/// implementation (e.g. one recording which fields were read).
pub trait RowAccess {
    /// Value of the field bound at `index`, `None` if the row has no such field.
    fn field(&self, index: usize) -> Option<&Value>;
}

/// Field values of the record under the dataset cursor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    position: usize,
    values: Vec<Value>,
}

impl Row {
    pub fn new(position: usize, values: Vec<Value>) -> Self {
        Self { position, values }
    }

    /// A row with no fields, used when no record is available.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Zero-based position of the record in the dataset.
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Moves the cursor to the next record.
    pub fn advance(&mut self, values: Vec<Value>) {
        self.position += 1;
        self.values = values;
    }
}

impl RowAccess for Row {
    fn field(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }
}

impl RowAccess for [Value] {
    fn field(&self, index: usize) -> Option<&Value> {
        self.get(index)
    }
}

/// A named column of the dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    pub name: String,
    pub kind: ValueKind,
}

/// Ordered field names (and declared kinds) available to a report's trees.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    fields: Vec<FieldDef>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a field and returns the schema, for chained construction.
    pub fn with_field(mut self, name: impl Into<String>, kind: ValueKind) -> Self {
        self.push(name, kind);
        self
    }

    /// Appends a field, returning its index.
    pub fn push(&mut self, name: impl Into<String>, kind: ValueKind) -> usize {
        self.fields.push(FieldDef {
            name: name.into(),
            kind,
        });
        self.fields.len() - 1
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|field| field.name == name)
    }

    pub fn field(&self, index: usize) -> Option<&FieldDef> {
        self.fields.get(index)
    }

    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Builds a field reference bound to the column `name`.
    pub fn field_ref(&self, name: &str) -> Result<Expr> {
        let index = self.index_of(name).ok_or_else(|| Error::UnboundReference {
            name: format!("Fields!{}", name),
        })?;
        let field = &self.fields[index];
        Ok(Expr::Field(FieldRef {
            index,
            name: field.name.clone(),
            kind: field.kind,
        }))
    }
}

/// Cooperative cancellation signal, optionally bounded by a deadline.
///
/// Clones share the cancellation flag; [`CancelToken::with_timeout`] derives a
/// token that also expires on its own.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
            || self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }

    /// A token sharing this token's flag which additionally expires after `timeout`.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        let deadline = Instant::now() + timeout;
        Self {
            flag: Arc::clone(&self.flag),
            deadline: Some(self.deadline.map_or(deadline, |d| d.min(deadline))),
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }
}

/// Per-render-job state: parameters, page cursor, aggregates and cancellation.
#[derive(Debug)]
pub struct ReportContext {
    name: String,
    parameters: HashMap<String, Value>,
    aggregates: RwLock<HashMap<String, Value>>,
    page_number: AtomicU32,
    total_pages: AtomicU32,
    execution_time: NaiveDateTime,
    cancel: CancelToken,
}

impl ReportContext {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameters: HashMap::new(),
            aggregates: RwLock::new(HashMap::new()),
            page_number: AtomicU32::new(1),
            total_pages: AtomicU32::new(1),
            execution_time: Local::now().naive_local(),
            cancel: CancelToken::new(),
        }
    }

    /// A context with nothing bound; only constant subtrees can be evaluated against it.
    pub fn detached() -> Self {
        Self::new(String::new())
    }

    pub fn with_parameter(mut self, name: impl Into<String>, value: Value) -> Self {
        self.parameters.insert(name.into(), value);
        self
    }

    pub fn with_execution_time(mut self, execution_time: NaiveDateTime) -> Self {
        self.execution_time = execution_time;
        self
    }

    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parameter(&self, name: &str) -> Option<&Value> {
        self.parameters.get(name)
    }

    pub fn aggregate(&self, name: &str) -> Option<Value> {
        self.aggregates.read().get(name).cloned()
    }

    /// Publishes the final value of an aggregate. Single writer: the render driver.
    pub fn set_aggregate(&self, name: impl Into<String>, value: Value) {
        self.aggregates.write().insert(name.into(), value);
    }

    pub fn clear_aggregates(&self) {
        self.aggregates.write().clear();
    }

    pub fn page_number(&self) -> u32 {
        self.page_number.load(Ordering::Acquire)
    }

    pub fn total_pages(&self) -> u32 {
        self.total_pages.load(Ordering::Acquire)
    }

    pub fn set_page(&self, page_number: u32, total_pages: u32) {
        self.page_number.store(page_number, Ordering::Release);
        self.total_pages.store(total_pages, Ordering::Release);
    }

    pub fn execution_time(&self) -> NaiveDateTime {
        self.execution_time
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}
