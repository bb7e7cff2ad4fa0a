use std::sync::Arc;

use async_trait::async_trait;

use super::FunctionError;
use crate::traits::{self, SortOrdered, SupportsOperation};
use crate::types::{OperationName, Output, Parameters, Shape};

/// What a filter observes once an operation has completed.
pub struct FilterInvocation<'a> {
    pub shape: Shape,
    pub operation: &'a OperationName,
    pub parameters: &'a Parameters,
    pub result: &'a Output,
}

/// Post execution hook (caching, auditing, ...).
///
/// Filters observe the result, they can't replace it.
#[async_trait]
pub trait DataFilter: SortOrdered + SupportsOperation + Send + Sync {
    async fn run(&self, invocation: &FilterInvocation<'_>) -> Result<(), FunctionError>;
}

/// Filters supporting `operation`, in ascending sort order.
pub fn select_filters(
    all: Vec<Arc<dyn DataFilter>>,
    operation: &OperationName,
) -> Vec<Arc<dyn DataFilter>> {
    traits::where_operation_supported(traits::by_sort_order(all), operation).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::OperationSet;

    struct Noop(i32, OperationSet);

    impl SortOrdered for Noop {
        fn sort_order(&self) -> i32 {
            self.0
        }
    }

    impl SupportsOperation for Noop {
        fn supports_operation(&self, operation: &OperationName) -> bool {
            self.1.contains(operation)
        }
    }

    #[async_trait]
    impl DataFilter for Noop {
        async fn run(&self, _: &FilterInvocation<'_>) -> Result<(), FunctionError> {
            Ok(())
        }
    }

    #[test]
    fn ordered_and_restricted() {
        let all: Vec<Arc<dyn DataFilter>> = vec![
            Arc::new(Noop(10, OperationSet::new(["Insert"]))),
            Arc::new(Noop(1, OperationSet::new(["Delete"]))),
            Arc::new(Noop(5, OperationSet::new(["insert", "delete"]))),
        ];

        let orders: Vec<i32> = select_filters(all, &"INSERT".into())
            .iter()
            .map(|f| f.sort_order())
            .collect();

        assert_eq!(orders, vec![5, 10]);
    }
}
