//! # Dispatch core
//!
//! A call is an operation name plus its arguments. The [`Dispatcher`] turns it into a
//! result following always the same path:
//!
//! 1. arguments are mapped to parameters ([`crate::mapper`]);
//! 2. a provider specific override is looked up ([`registry::resolve`]);
//! 3. the override executes the call, or declines and the generic command named after the
//!    lower-cased operation is executed through the [`DbAccess`];
//! 4. every filter supporting the operation observes the result, in sort order;
//! 5. the result is returned.
//!
//! There are no retries and nothing runs in the background: a call is a single future that
//! completes when the result (or the first error) is available.

use std::sync::Arc;
use std::time::Instant;

use log::{debug, trace};

use crate::mapper::{self, CallInfo};
use crate::params;
use crate::provider::{DbAccess, DbAccessRef, UnitOfWork, UnitOfWorkHandle};
use crate::registry::{
    self, DataFilter, FilterInvocation, Invocation, Outcome, Source, SpecificFunction,
};
use crate::types::{
    DataSet, DataTable, OperationName, Output, Parameters, RowReader, Shape, Value,
};

mod error;
pub use error::*;


#[derive(Debug, Clone, Default, PartialEq)]
pub struct DispatchOptions {
    /// Expand entity arguments into one parameter per field before execution
    pub expand_entities: bool,
}

impl DispatchOptions {
    pub fn from_configurables(c: &params::Configurables) -> Self {
        Self {
            expand_entities: c.expand_entities,
        }
    }
}

/// A single call: operation name, arguments and an optional unit of work.
///
/// Positional arguments come first, named ones follow.
#[derive(Clone)]
pub struct Call {
    pub operation: OperationName,
    pub arguments: Vec<Value>,
    pub info: CallInfo,
    /// Explicit unit of work, takes precedence over the dispatcher one
    pub unit_of_work: Option<Arc<dyn UnitOfWork>>,
    misordered: bool,
}

impl Call {
    pub fn new(operation: impl Into<OperationName>) -> Self {
        Self {
            operation: operation.into(),
            arguments: Vec::new(),
            info: CallInfo::positional(),
            unit_of_work: None,
            misordered: false,
        }
    }

    /// Appends a positional argument.
    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        if !self.info.names.is_empty() {
            self.misordered = true;
        }
        self.arguments.push(value.into());
        self
    }

    /// Appends a named argument.
    pub fn named(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.info.names.push(Some(name.to_owned()));
        self.arguments.push(value.into());
        self
    }

    pub fn with_unit_of_work(mut self, uow: Arc<dyn UnitOfWork>) -> Self {
        self.unit_of_work = Some(uow);
        self
    }

    fn validate(&self) -> Result<(), DispatchError> {
        if self.operation.is_empty() {
            return Err(DispatchError::ContractViolation(
                "empty operation name".to_owned(),
            ));
        }
        if self.misordered {
            return Err(DispatchError::ContractViolation(format!(
                "positional argument after a named one in `{}`",
                self.operation
            )));
        }
        Ok(())
    }
}

impl std::fmt::Debug for Call {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Call")
            .field("operation", &self.operation)
            .field("arguments", &self.arguments)
            .field("info", &self.info)
            .field("unit_of_work", &self.unit_of_work.as_ref().map(|u| u.id()))
            .finish()
    }
}

/// Typed result of a shape.
pub trait ShapeResult: Sized {
    const SHAPE: Shape;

    fn from_output(operation: &OperationName, output: Output) -> Result<Self, DispatchError>;
}

fn mismatch(operation: &OperationName, expected: Shape, output: &Output) -> DispatchError {
    DispatchError::ShapeMismatch {
        operation: operation.to_string(),
        expected,
        actual: output.shape(),
    }
}

macro_rules! shape_result {
    ($ty:ty, $shape:expr, $variant:ident) => {
        impl ShapeResult for $ty {
            const SHAPE: Shape = $shape;

            fn from_output(
                operation: &OperationName,
                output: Output,
            ) -> Result<Self, DispatchError> {
                match output {
                    Output::$variant(v) => Ok(v),
                    other => Err(mismatch(operation, Self::SHAPE, &other)),
                }
            }
        }
    };
}

shape_result!(DataTable, Shape::Table, Table);
shape_result!(DataSet, Shape::Set, Set);
shape_result!(RowReader, Shape::Reader, Reader);
shape_result!(Value, Shape::Scalar, Scalar);

impl ShapeResult for () {
    const SHAPE: Shape = Shape::NonQuery;

    fn from_output(operation: &OperationName, output: Output) -> Result<Self, DispatchError> {
        match output {
            Output::None => Ok(()),
            other => Err(mismatch(operation, Self::SHAPE, &other)),
        }
    }
}

pub type OverrideSource = Arc<dyn Source<dyn SpecificFunction>>;
pub type FilterSource = Arc<dyn Source<dyn DataFilter>>;

pub struct Dispatcher {
    db: DbAccessRef,
    overrides: OverrideSource,
    filters: FilterSource,
    unit_of_work: UnitOfWorkHandle,
    options: DispatchOptions,
}

impl Dispatcher {
    pub fn new(db: DbAccessRef, overrides: OverrideSource, filters: FilterSource) -> Self {
        Self {
            db,
            overrides,
            filters,
            unit_of_work: UnitOfWorkHandle::new(),
            options: DispatchOptions::default(),
        }
    }

    pub fn with_options(mut self, options: DispatchOptions) -> Self {
        self.options = options;
        self
    }

    pub fn provider_name(&self) -> &str {
        self.db.provider_name()
    }

    /// Sets the ambient unit of work. Only a weak reference is kept.
    pub fn set_unit_of_work(&self, uow: Option<&Arc<dyn UnitOfWork>>) {
        self.unit_of_work.set(uow);
    }

    /// Ambient unit of work, `None` if unset or already released by its owner.
    pub fn unit_of_work(&self) -> Option<Arc<dyn UnitOfWork>> {
        self.unit_of_work.get()
    }

    pub async fn fetch_table(&self, call: Call) -> Result<DataTable, DispatchError> {
        self.dispatch_as(call).await
    }

    pub async fn fetch_set(&self, call: Call) -> Result<DataSet, DispatchError> {
        self.dispatch_as(call).await
    }

    pub async fn fetch_reader(&self, call: Call) -> Result<RowReader, DispatchError> {
        self.dispatch_as(call).await
    }

    pub async fn fetch_scalar(&self, call: Call) -> Result<Value, DispatchError> {
        self.dispatch_as(call).await
    }

    pub async fn execute_non_query(&self, call: Call) -> Result<(), DispatchError> {
        self.dispatch_as(call).await
    }

    pub async fn dispatch_as<R: ShapeResult>(&self, call: Call) -> Result<R, DispatchError> {
        let operation = call.operation.clone();
        let output = self.dispatch(R::SHAPE, call).await?;
        R::from_output(&operation, output)
    }

    /// Executes `call` with the given shape.
    pub async fn dispatch(&self, shape: Shape, call: Call) -> Result<Output, DispatchError> {
        call.validate()?;

        let start = Instant::now();
        let Call {
            operation,
            arguments,
            info,
            unit_of_work,
            ..
        } = call;

        let mut parameters = mapper::map_arguments(&info, arguments);
        if self.options.expand_entities && parameters.has_entities() {
            parameters = parameters.expand_entities();
        }
        trace!("`{}` parameters: {:?}", operation, parameters);

        let uow = unit_of_work.or_else(|| self.unit_of_work.get());
        let uow_ref = uow.as_deref();

        let specific = registry::resolve(
            self.overrides.snapshot(),
            self.db.provider_name(),
            &operation,
        );

        let mut output = None;

        if let Some(specific) = specific {
            let db: &dyn DbAccess = self.db.as_ref();
            let invocation = Invocation {
                shape,
                operation: &operation,
                parameters: &parameters,
                db,
                unit_of_work: uow_ref,
            };

            let outcome = specific.execute(&invocation).await.map_err(|e| {
                DispatchError::Override {
                    operation: operation.to_string(),
                    source: e,
                }
            })?;

            match outcome {
                Outcome::Handled(out) => {
                    if out.shape() != shape {
                        return Err(mismatch(&operation, shape, &out));
                    }
                    debug!("`{}` ({}) handled by override", operation, shape);
                    output = Some(out);
                }
                Outcome::Declined => {
                    trace!("override declined `{}`", operation);
                }
            }
        }

        let output = match output {
            Some(output) => output,
            None => {
                let output = self
                    .execute_generic(shape, &operation, parameters.clone(), uow_ref)
                    .await?;
                debug!("`{}` ({}) executed as generic command", operation, shape);
                output
            }
        };

        self.run_filters(shape, &operation, &parameters, &output)
            .await?;

        debug!(
            "`{}` ({}) completed in {}us",
            operation,
            shape,
            start.elapsed().as_micros()
        );

        Ok(output)
    }

    async fn execute_generic(
        &self,
        shape: Shape,
        operation: &OperationName,
        parameters: Parameters,
        uow: Option<&dyn UnitOfWork>,
    ) -> Result<Output, DispatchError> {
        let cmd = self
            .db
            .build_command(operation.command_name(), true, parameters)?;

        trace!("executing command `{}`", cmd.text);

        let output = match shape {
            Shape::Table => Output::Table(self.db.fetch_table(&cmd, uow).await?),
            Shape::Set => Output::Set(self.db.fetch_set(&cmd, uow).await?),
            Shape::Reader => Output::Reader(self.db.fetch_reader(&cmd, uow).await?),
            Shape::Scalar => Output::Scalar(self.db.execute_scalar(&cmd, uow).await?),
            Shape::NonQuery => {
                let affected = self.db.execute_non_query(&cmd, uow).await?;
                trace!("`{}` affected {} rows", operation, affected);
                Output::None
            }
        };

        Ok(output)
    }

    /// Runs the filters supporting `operation`. The first failure stops the pipeline and is
    /// returned in place of the result.
    async fn run_filters(
        &self,
        shape: Shape,
        operation: &OperationName,
        parameters: &Parameters,
        result: &Output,
    ) -> Result<(), DispatchError> {
        let filters = registry::select_filters(self.filters.snapshot(), operation);
        if filters.is_empty() {
            return Ok(());
        }

        trace!("running {} filters on `{}`", filters.len(), operation);

        let invocation = FilterInvocation {
            shape,
            operation,
            parameters,
            result,
        };

        for filter in filters {
            filter
                .run(&invocation)
                .await
                .map_err(|e| DispatchError::Filter {
                    operation: operation.to_string(),
                    source: e,
                })?;
        }

        Ok(())
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("provider", &self.db.provider_name())
            .field("unit_of_work", &self.unit_of_work)
            .field("options", &self.options)
            .finish()
    }
}
