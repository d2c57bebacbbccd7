//! [`MockBackend`] is the object mock wrappers are built on. It behaves like
//! a plain [`Mock`] except that while a [`crate::Test`] runs it also knows the
//! return stacks the test declared, so repeated calls to the same method can
//! return different values:
//!
//! ```text
//! return_stack = [[nil, "conflict"], [{"id": 2}, nil]]
//!
//! call 1 -> [nil, "conflict"]      stack: [[{"id": 2}, nil]]
//! call 2 -> [{"id": 2}, nil]       stack: [[{"id": 2}, nil]]
//! call 3 -> [{"id": 2}, nil]       ...
//! ```
//!
//! The last element is never consumed, every call after the first keeps
//! returning it.

use std::{fmt, sync::Arc};

use parking_lot::Mutex;

use super::{Call, Matcher, Mock};
use crate::{report::Failure, Returns, Value};

/// Remaining return values of one declared operation. Shared between the
/// [`crate::Operation`] that declared it and the backend consuming it.
pub(crate) type SharedStack = Arc<Mutex<Vec<Returns>>>;

/// Operation bound to a backend for the duration of a test.
pub(crate) struct BoundOperation {
    pub method: String,
    pub call: Call,
    pub stack: SharedStack,
}

/// Call recorder with return stack support. Clones share everything, so the
/// test keeps one clone and the handler under test gets another.
#[derive(Clone, Default)]
pub struct MockBackend {
    mock: Mock,
    operations: Arc<Mutex<Vec<BoundOperation>>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// The underlying recorder.
    pub fn mock(&self) -> &Mock {
        &self.mock
    }

    pub fn on(&self, method: impl Into<String>, matchers: Vec<Matcher>) -> Call {
        self.mock.on(method, matchers)
    }

    /// Entry point for mock wrappers: report that `method` was called with
    /// `arguments` and get back what the test declared for it.
    ///
    /// If the first bound operation whose expectation accepts these
    /// arguments has a return stack, that expectation is switched to the
    /// front of the stack before matching and the stack is cut down to its
    /// last element.
    pub fn method_called(&self, method: &str, arguments: Vec<Value>) -> crate::Result<Returns> {
        {
            let operations = self.operations.lock();

            let matching = operations
                .iter()
                .find(|op| op.method == method && op.call.accepts(method, &arguments));

            if let Some(operation) = matching {
                let mut stack = operation.stack.lock();

                if let Some(next) = stack.first().cloned() {
                    operation.call.set_returns(next);
                    let last = stack.len() - 1;
                    stack.drain(..last);
                }
            }
        }

        self.mock.method_called(method, &arguments)
    }

    pub fn verify(&self) -> Vec<Failure> {
        self.mock.verify()
    }

    pub fn assert_expectations(&self) {
        self.mock.assert_expectations()
    }

    /// Whether both backends share the same recorder.
    pub fn same(&self, other: &MockBackend) -> bool {
        self.mock.same(&other.mock)
    }

    /// Replaces the operations consulted by [`MockBackend::method_called`].
    pub(crate) fn bind(&self, operations: Vec<BoundOperation>) {
        *self.operations.lock() = operations;
    }
}

impl fmt::Debug for MockBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockBackend")
            .field("mock", &self.mock)
            .field("bound", &self.operations.lock().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{returns, values};

    fn bind_stack(backend: &MockBackend, method: &str, stack: Vec<Returns>) -> Call {
        let initial = stack.last().cloned().unwrap_or_default();
        let call = backend.on(method, vec![Matcher::Anything]).returning(initial);

        backend.bind(vec![BoundOperation {
            method: String::from(method),
            call: call.clone(),
            stack: Arc::new(Mutex::new(stack)),
        }]);

        call
    }

    #[test]
    fn stack_converges_to_last_element() {
        let backend = MockBackend::new();
        bind_stack(
            &backend,
            "Create",
            vec![returns![1], returns![2], returns![3]],
        );

        let values: Vec<i32> = (0..4)
            .map(|_| {
                backend
                    .method_called("Create", values!["x"])
                    .unwrap()
                    .decode(0)
                    .unwrap()
            })
            .collect();

        assert_eq!(values, vec![1, 3, 3, 3]);
    }

    #[test]
    fn stacks_follow_matching_operation() {
        let backend = MockBackend::new();

        let mut bound = Vec::new();
        for (id, stack) in [(1u64, ["a-first", "a-last"]), (2u64, ["b-first", "b-last"])] {
            let stack: Vec<Returns> = stack.iter().map(|name| returns![*name]).collect();
            let call = backend
                .on("GetUser", vec![Matcher::Exact(Value::from(id))])
                .returning(stack[1].clone());

            bound.push(BoundOperation {
                method: String::from("GetUser"),
                call,
                stack: Arc::new(Mutex::new(stack)),
            });
        }
        backend.bind(bound);

        let name = |id: u64| -> String {
            backend
                .method_called("GetUser", values![id])
                .unwrap()
                .decode(0)
                .unwrap()
        };

        assert_eq!(name(2), "b-first");
        assert_eq!(name(1), "a-first");
        assert_eq!(name(2), "b-last");
        assert_eq!(name(1), "a-last");
        assert!(backend.verify().is_empty());
    }

    #[test]
    fn single_element_stack_is_fixed() {
        let backend = MockBackend::new();
        let call = bind_stack(&backend, "Get", vec![returns!["a"]]);

        for _ in 0..3 {
            let returns = backend.method_called("Get", values![1]).unwrap();
            assert_eq!(returns.decode::<String>(0).unwrap(), "a");
        }

        assert_eq!(call.calls(), 3);
    }

    #[test]
    fn unbound_method_uses_registered_returns() {
        let backend = MockBackend::new();
        backend
            .on("Get", vec![Matcher::any_of_type::<i32>()])
            .returning(returns!["fixed"]);

        let returns = backend.method_called("Get", values![1]).unwrap();

        assert_eq!(returns.decode::<String>(0).unwrap(), "fixed");
        assert!(backend.verify().is_empty());
    }

    #[test]
    fn clones_share_state() {
        let backend = MockBackend::new();
        let handler_side = backend.clone();
        backend.on("Ping", vec![]);

        handler_side.method_called("Ping", vec![]).unwrap();

        assert!(backend.same(&handler_side));
        assert!(backend.verify().is_empty());
    }
}
