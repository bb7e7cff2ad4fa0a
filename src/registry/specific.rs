use std::sync::Arc;

use async_trait::async_trait;
use log::trace;

use super::FunctionError;
use crate::provider::{DbAccess, UnitOfWork};
use crate::traits::{self, SortOrdered, SupportsOperation};
use crate::types::{OperationName, Output, Parameters, Shape};

/// Result reported by a [`SpecificFunction`].
#[derive(Debug)]
pub enum Outcome {
    /// The override executed the operation, its output is the call result
    Handled(Output),
    /// The override gives up, the generic command is executed instead
    Declined,
}

/// Everything an override receives about the call.
pub struct Invocation<'a> {
    pub shape: Shape,
    pub operation: &'a OperationName,
    pub parameters: &'a Parameters,
    pub db: &'a dyn DbAccess,
    pub unit_of_work: Option<&'a dyn UnitOfWork>,
}

/// Provider specific replacement for the generic command of one or more operations.
///
/// The override both decides and executes: returning [`Outcome::Handled`] makes its output
/// the call result, [`Outcome::Declined`] falls back to the generic command.
#[async_trait]
pub trait SpecificFunction: SortOrdered + SupportsOperation + Send + Sync {
    /// Provider this override applies to, compared case-sensitively with
    /// [`DbAccess::provider_name`].
    fn provider_name(&self) -> &str;

    async fn execute(&self, invocation: &Invocation<'_>) -> Result<Outcome, FunctionError>;
}

/// Selects the override to use for `operation` on `provider_name`.
///
/// Candidates are restricted to the provider, sorted by ascending sort order (ties keep
/// registration order) and restricted to the ones supporting the operation; the first one
/// wins.
pub fn resolve(
    all: Vec<Arc<dyn SpecificFunction>>,
    provider_name: &str,
    operation: &OperationName,
) -> Option<Arc<dyn SpecificFunction>> {
    let candidates = all
        .into_iter()
        .filter(|f| f.provider_name() == provider_name)
        .collect::<Vec<_>>();

    trace!(
        "{} override candidates for provider `{}`",
        candidates.len(),
        provider_name
    );

    traits::where_operation_supported(traits::by_sort_order(candidates), operation).next()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::OperationSet;

    struct Fixed {
        provider: &'static str,
        order: i32,
        ops: OperationSet,
    }

    impl SortOrdered for Fixed {
        fn sort_order(&self) -> i32 {
            self.order
        }
    }

    impl SupportsOperation for Fixed {
        fn supports_operation(&self, operation: &OperationName) -> bool {
            self.ops.contains(operation)
        }
    }

    #[async_trait]
    impl SpecificFunction for Fixed {
        fn provider_name(&self) -> &str {
            self.provider
        }

        async fn execute(&self, _: &Invocation<'_>) -> Result<Outcome, FunctionError> {
            Ok(Outcome::Declined)
        }
    }

    fn f(provider: &'static str, order: i32, ops: &[&'static str]) -> Arc<dyn SpecificFunction> {
        Arc::new(Fixed {
            provider,
            order,
            ops: OperationSet::new(ops.iter().copied()),
        })
    }

    #[test]
    fn provider_match_is_exact() {
        let all = vec![f("Postgres", 0, &["GetUser"]), f("postgres", 1, &["GetUser"])];

        let found = resolve(all, "postgres", &"GetUser".into()).unwrap();
        assert_eq!(found.sort_order(), 1);
    }

    #[test]
    fn lowest_sort_order_wins() {
        let all = vec![
            f("pg", 20, &["insert"]),
            f("pg", 10, &["insert"]),
            f("pg", 5, &["delete"]),
        ];

        let found = resolve(all, "pg", &"Insert".into()).unwrap();
        assert_eq!(found.sort_order(), 10);
    }

    #[test]
    fn ties_keep_registration_order() {
        let all = vec![f("pg", 1, &["x"]), f("pg", 1, &["x"])];
        let first = all[0].clone();

        let found = resolve(all, "pg", &"X".into()).unwrap();
        assert!(Arc::ptr_eq(&found, &first));
    }

    #[test]
    fn case_insensitive_operation() {
        let all = vec![f("pg", 0, &["GetUser"])];

        assert!(resolve(all.clone(), "pg", &"getuser".into()).is_some());
        assert!(resolve(all, "pg", &"GETUSER".into()).is_some());
    }

    #[test]
    fn none_when_nothing_matches() {
        let all = vec![f("pg", 0, &["GetUser"])];

        assert!(resolve(all.clone(), "mysql", &"GetUser".into()).is_none());
        assert!(resolve(all, "pg", &"GetUsers".into()).is_none());
        assert!(resolve(Vec::new(), "pg", &"GetUser".into()).is_none());
    }

    #[test]
    fn idempotent() {
        let all = vec![f("pg", 3, &["op"]), f("pg", 2, &["op"])];

        let first = resolve(all.clone(), "pg", &"op".into()).unwrap();
        let second = resolve(all, "pg", &"op".into()).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }
}
