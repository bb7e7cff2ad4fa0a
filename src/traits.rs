use std::collections::HashSet;
use std::sync::Arc;

use crate::types::OperationName;

/// Position of an item in an ordered pipeline, lower values come first.
pub trait SortOrdered {
    fn sort_order(&self) -> i32;
}

/// Declares which operations an item applies to.
pub trait SupportsOperation {
    fn supports_operation(&self, operation: &OperationName) -> bool;
}

/// Set of case-insensitive operation names.
#[derive(Debug, Clone, Default)]
pub struct OperationSet(HashSet<OperationName>);

impl OperationSet {
    pub fn new<I, S>(operations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OperationName>,
    {
        Self(operations.into_iter().map(Into::into).collect())
    }

    pub fn contains(&self, operation: &OperationName) -> bool {
        self.0.contains(operation)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Sorts by ascending [`SortOrdered::sort_order`]. The sort is stable: items with the same
/// order keep their registration order.
pub fn by_sort_order<T>(mut items: Vec<Arc<T>>) -> Vec<Arc<T>>
where
    T: SortOrdered + ?Sized,
{
    items.sort_by_key(|item| item.sort_order());
    items
}

/// Keeps only the items supporting `operation`.
pub fn where_operation_supported<'a, T, I>(
    items: I,
    operation: &'a OperationName,
) -> impl Iterator<Item = Arc<T>> + 'a
where
    T: SupportsOperation + ?Sized + 'a,
    I: IntoIterator<Item = Arc<T>>,
    I::IntoIter: 'a,
{
    items
        .into_iter()
        .filter(move |item| item.supports_operation(operation))
}
