//! # Argument mapping
//!
//! Turns the arguments of a call into the ordered `(name, value)` list bound to a command.
//!
//! Calls bind *leading positional, trailing named* arguments, so names are aligned to
//! values starting from the end: the last value takes the last name, the one before takes
//! the name before, and so on until names run out. Values left over at the front get an
//! empty name. Surplus names (more names than values) are ignored. Mapping never fails.

use log::trace;

use crate::types::{Parameter, Parameters, Value};

/// Named-argument metadata of a call.
///
/// `names` holds only the named tail of the arguments, in call-site order. A `None`
/// entry stands for a name the call site could not provide.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallInfo {
    pub names: Vec<Option<String>>,
}

impl CallInfo {
    pub fn new(names: Vec<Option<String>>) -> Self {
        Self { names }
    }

    pub fn positional() -> Self {
        Self::default()
    }

    pub fn named(names: &[&str]) -> Self {
        Self {
            names: names.iter().map(|n| Some((*n).to_owned())).collect(),
        }
    }
}

/// Aligns `info.names` to `values` from the back. The result always has
/// `values.len()` entries.
pub fn map_arguments(info: &CallInfo, values: Vec<Value>) -> Parameters {
    let n = values.len();
    let m = info.names.len();

    trace!("mapping {} values on {} names", n, m);

    let params = values
        .into_iter()
        .enumerate()
        .map(|(i, value)| {
            let name = name_index(i, n, m)
                .and_then(|j| info.names[j].clone())
                .unwrap_or_default();
            Parameter { name, value }
        })
        .collect::<Vec<_>>();

    Parameters::new(params)
}

/// Index in the names list paired with value `i`, if any.
fn name_index(i: usize, n: usize, m: usize) -> Option<usize> {
    if m >= n {
        Some(i + (m - n))
    } else if i >= n - m {
        Some(i - (n - m))
    } else {
        None
    }
}
