//! Core data types shared by every layer of the dispatcher: the dynamic [`Value`], the
//! parameter list bound to commands, the case-insensitive [`OperationName`], the requested
//! [`Shape`] and the tabular results.

mod value;
pub use value::*;

mod shape;
pub use shape::*;

mod operation;
pub use operation::*;

mod parameter;
pub use parameter::*;

mod table;
pub use table::*;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("unknown shape `{0}`")]
    UnknownShape(String),
}
