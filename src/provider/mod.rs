//! # Provider access
//!
//! The dispatcher never talks to a database directly. Everything it needs from the
//! underlying system is expressed by the [`DbAccess`] trait: building a parameterized
//! command and running it in one of the five execution forms.
//!
//! * **Commands** carry the parameters alongside the command text, values are always bound,
//!   never spliced into the text.
//! * **Units of work** are opaque transactional contexts owned by the caller. The dispatcher
//!   only ever holds them weakly (see [`UnitOfWorkHandle`]).
//!
//! [`postgres`] contains the PostgreSQL implementation.

use std::any::Any;
use std::sync::{Arc, PoisonError, RwLock, Weak};

use async_trait::async_trait;

use crate::types::{DataSet, DataTable, Parameters, RowReader, Value};

pub mod postgres;

#[cfg(test)]
pub mod testing;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("database error :: {0}")]
    Database(#[from] sqlx::Error),
    #[error("unable to decode column `{column}` of type `{type_name}`")]
    Decode { column: String, type_name: String },
    #[error("unsupported value of kind `{0}`")]
    UnsupportedValue(&'static str),
    #[error("invalid command `{name}`: {msg}")]
    InvalidCommand { name: String, msg: String },
    #[error("unit of work does not belong to provider `{0}`")]
    ForeignUnitOfWork(String),
    #[error("unit of work already completed")]
    UnitOfWorkCompleted,
    #[error("execution failed: {0}")]
    Execution(String),
}

/// How the command text has to be interpreted by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    /// Call to a named database routine
    StoredProcedure,
    /// Raw command text
    Text,
}

/// A command ready to be executed by a [`DbAccess`].
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    /// Name the command was built for
    pub name: String,
    /// Provider specific text (e.g. the routine call expression)
    pub text: String,
    pub kind: CommandKind,
    pub parameters: Parameters,
}

impl Command {
    pub fn new(name: &str, text: String, kind: CommandKind, parameters: Parameters) -> Self {
        Self {
            name: name.to_owned(),
            text,
            kind,
            parameters,
        }
    }

    pub fn is_stored_procedure(&self) -> bool {
        self.kind == CommandKind::StoredProcedure
    }
}

/// Transactional context owned by the caller.
///
/// Implementations are downcast by their provider through [`UnitOfWork::as_any`].
pub trait UnitOfWork: Any + Send + Sync {
    fn id(&self) -> uuid::Uuid;

    fn as_any(&self) -> &dyn Any;
}

/// Execution primitives required by the dispatcher.
///
/// Implementations must be safe for concurrent use: the dispatcher shares a single
/// instance between every in-flight call.
#[async_trait]
pub trait DbAccess: Send + Sync {
    /// Identifier matched against [`crate::registry::SpecificFunction::provider_name`].
    fn provider_name(&self) -> &str;

    fn build_command(
        &self,
        name: &str,
        is_stored_procedure: bool,
        parameters: Parameters,
    ) -> Result<Command, Error>;

    async fn fetch_table(
        &self,
        cmd: &Command,
        uow: Option<&dyn UnitOfWork>,
    ) -> Result<DataTable, Error>;

    async fn fetch_set(&self, cmd: &Command, uow: Option<&dyn UnitOfWork>)
    -> Result<DataSet, Error>;

    async fn fetch_reader(
        &self,
        cmd: &Command,
        uow: Option<&dyn UnitOfWork>,
    ) -> Result<RowReader, Error>;

    async fn execute_scalar(&self, cmd: &Command, uow: Option<&dyn UnitOfWork>)
    -> Result<Value, Error>;

    /// Returns the number of affected rows, when reported by the database.
    async fn execute_non_query(
        &self,
        cmd: &Command,
        uow: Option<&dyn UnitOfWork>,
    ) -> Result<u64, Error>;
}

pub type DbAccessRef = Arc<dyn DbAccess>;

/// Non-owning, settable reference to a [`UnitOfWork`].
///
/// Reading the handle upgrades the weak reference in a single step, so a unit of work
/// released by its owner reads as `None` and is never observed half-dropped.
#[derive(Default)]
pub struct UnitOfWorkHandle {
    inner: RwLock<Option<Weak<dyn UnitOfWork>>>,
}

impl UnitOfWorkHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, uow: Option<&Arc<dyn UnitOfWork>>) {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        *inner = uow.map(Arc::downgrade);
    }

    pub fn get(&self) -> Option<Arc<dyn UnitOfWork>> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .and_then(Weak::upgrade)
    }
}

impl std::fmt::Debug for UnitOfWorkHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnitOfWorkHandle")
            .field("alive", &self.get().map(|u| u.id()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::testing::MockUnitOfWork;

    #[test]
    fn unit_of_work_handle_is_weak() {
        let handle = UnitOfWorkHandle::new();
        assert!(handle.get().is_none());

        let uow: Arc<dyn UnitOfWork> = Arc::new(MockUnitOfWork::new());
        let id = uow.id();
        handle.set(Some(&uow));

        assert_eq!(handle.get().map(|u| u.id()), Some(id));

        drop(uow);

        assert!(handle.get().is_none());
    }

    #[test]
    fn unit_of_work_handle_reset() {
        let handle = UnitOfWorkHandle::new();
        let uow: Arc<dyn UnitOfWork> = Arc::new(MockUnitOfWork::new());

        handle.set(Some(&uow));
        handle.set(None);

        assert!(handle.get().is_none());
    }

    #[test]
    fn handle_does_not_extend_lifetime() {
        let handle = UnitOfWorkHandle::new();
        let uow: Arc<dyn UnitOfWork> = Arc::new(MockUnitOfWork::new());
        handle.set(Some(&uow));

        assert_eq!(Arc::strong_count(&uow), 1);
    }
}
