//! # Facade
//!
//! [`DbFunction`] is the entry point used by application code. It exposes one surface per
//! shape, and any operation name can be called on any surface without prior registration:
//!
//! ```no_run
//! # async fn demo(db: dbfunc::facade::DbFunction) -> Result<(), dbfunc::dispatch::DispatchError> {
//! let count = db.scalar().call("GetCount").named("board_id", 3).execute().await?;
//! let users = db.get_data().call("user_list").arg(1).execute().await?;
//! db.query().call("topic_delete").named("topic_id", 42).execute().await?;
//! # Ok(())
//! # }
//! ```
//!
//! The surface alone decides the shape: `scalar().call("user_list")` dispatches the
//! `user_list` operation as a scalar fetch.

use std::marker::PhantomData;
use std::sync::Arc;

use crate::dispatch::{Call, DispatchError, Dispatcher, ShapeResult};
use crate::provider::UnitOfWork;
use crate::types::{DataSet, DataTable, RowReader, Shape, Value};

#[derive(Debug, Clone)]
pub struct DbFunction {
    dispatcher: Arc<Dispatcher>,
}

impl DbFunction {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher: Arc::new(dispatcher),
        }
    }

    pub fn from_shared(dispatcher: Arc<Dispatcher>) -> Self {
        Self { dispatcher }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Calls returning a single table.
    pub fn get_data(&self) -> Surface<'_, DataTable> {
        Surface::new(&self.dispatcher)
    }

    /// Calls returning a set of tables.
    pub fn get_data_set(&self) -> Surface<'_, DataSet> {
        Surface::new(&self.dispatcher)
    }

    /// Calls returning a forward-only reader.
    pub fn get_data_reader(&self) -> Surface<'_, RowReader> {
        Surface::new(&self.dispatcher)
    }

    /// Calls returning a single value.
    pub fn scalar(&self) -> Surface<'_, Value> {
        Surface::new(&self.dispatcher)
    }

    /// Calls returning nothing.
    pub fn query(&self) -> Surface<'_, ()> {
        Surface::new(&self.dispatcher)
    }

    pub fn set_unit_of_work(&self, uow: Option<&Arc<dyn UnitOfWork>>) {
        self.dispatcher.set_unit_of_work(uow);
    }

    pub fn unit_of_work(&self) -> Option<Arc<dyn UnitOfWork>> {
        self.dispatcher.unit_of_work()
    }
}

/// Call capturing surface bound to the shape of `R`.
pub struct Surface<'a, R> {
    dispatcher: &'a Dispatcher,
    _result: PhantomData<fn() -> R>,
}

impl<'a, R: ShapeResult> Surface<'a, R> {
    fn new(dispatcher: &'a Dispatcher) -> Self {
        Self {
            dispatcher,
            _result: PhantomData,
        }
    }

    pub fn shape(&self) -> Shape {
        R::SHAPE
    }

    /// Starts a call to `operation`.
    pub fn call(&self, operation: &str) -> CallBuilder<'a, R> {
        CallBuilder {
            dispatcher: self.dispatcher,
            call: Call::new(operation),
            _result: PhantomData,
        }
    }
}

#[must_use = "a call does nothing until executed"]
pub struct CallBuilder<'a, R> {
    dispatcher: &'a Dispatcher,
    call: Call,
    _result: PhantomData<fn() -> R>,
}

impl<R: ShapeResult> CallBuilder<'_, R> {
    /// Positional argument, must precede every named argument.
    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.call = self.call.arg(value);
        self
    }

    pub fn named(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.call = self.call.named(name, value);
        self
    }

    /// Runs the call inside `uow` instead of the facade unit of work.
    pub fn unit_of_work(mut self, uow: Arc<dyn UnitOfWork>) -> Self {
        self.call = self.call.with_unit_of_work(uow);
        self
    }

    pub fn into_call(self) -> Call {
        self.call
    }

    pub async fn execute(self) -> Result<R, DispatchError> {
        self.dispatcher.dispatch_as::<R>(self.call).await
    }
}
