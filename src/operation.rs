//! Declared backend operations and references into them.

use std::{borrow::Cow, fmt, sync::Arc};

use parking_lot::Mutex;
use serde::Serialize;

use crate::{
    mock::{
        backend::{BoundOperation, SharedStack},
        Call,
        Matcher,
    },
    value,
    Error,
    MockBackend,
    Returns,
    Value,
};

/// Declared argument of an [`Operation`]. Plain values are registered as
/// "any value of the same type", the other variants say explicitly how the
/// argument should be matched.
#[derive(Clone, Debug, PartialEq)]
pub enum Arg {
    /// Matches any argument with the type of this value. The value itself can
    /// still be reused as a body through an [`OperationRef`].
    Value(Value),

    /// Matches only this exact value.
    Exact(Value),

    /// Matches any argument of the named type.
    AnyOfType(Cow<'static, str>),

    /// Matches anything, typically a context or a connection handle.
    Anything,
}

impl Arg {
    pub fn exact(value: impl Into<Value>) -> Self {
        Arg::Exact(value.into())
    }

    pub fn any_of_type<T: ?Sized>() -> Self {
        Arg::AnyOfType(Cow::Borrowed(value::type_name::<T>()))
    }

    /// Matcher installed on the mock for this argument.
    pub fn matcher(&self) -> Matcher {
        match self {
            Arg::Value(value) => Matcher::AnyOfType(Cow::Owned(value.type_name().to_owned())),
            Arg::Exact(value) => Matcher::Exact(value.clone()),
            Arg::AnyOfType(type_name) => Matcher::AnyOfType(type_name.clone()),
            Arg::Anything => Matcher::Anything,
        }
    }

    /// The concrete value, if this argument carries one.
    pub fn value(&self) -> Option<&Value> {
        match self {
            Arg::Value(value) | Arg::Exact(value) => Some(value),
            Arg::AnyOfType(_) | Arg::Anything => None,
        }
    }
}

impl<T: Serialize> From<T> for Arg {
    fn from(value: T) -> Self {
        Arg::Value(Value::of(&value))
    }
}

impl From<Value> for Arg {
    fn from(value: Value) -> Self {
        Arg::Value(value)
    }
}

/// Builds a `Vec<Arg>` from values and explicit [`Arg`] matchers.
///
/// ```
/// use litmus::{args, Arg};
///
/// let args = args![Arg::Anything, 1u64, "name"];
/// assert_eq!(args.len(), 3);
/// ```
#[macro_export]
macro_rules! args {
    ($($arg:expr),* $(,)?) => {
        vec![$($crate::Arg::from($arg)),*]
    };
}

/// An expected backend method call.
#[derive(Default)]
pub struct Operation {
    /// Method name, as reported by the mock wrapper.
    pub name: String,

    pub args: Vec<Arg>,

    /// Fixed return values. When absent, the last element of
    /// [`Operation::return_stack`] is registered instead.
    pub returns: Option<Returns>,

    /// Return values for successive calls, consumed from the front and
    /// converging to the last element.
    pub return_stack: Vec<Returns>,

    /// Exact number of expected calls. At least one when unset.
    pub times: Option<usize>,

    /// Backend to register this operation on instead of the one passed to
    /// [`crate::Test::run`].
    pub backend: Option<MockBackend>,

    installed: Option<Installed>,
}

/// State kept once the operation has been registered.
struct Installed {
    backend: MockBackend,
    call: Call,
    stack: SharedStack,
}

impl Operation {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn args(mut self, args: Vec<Arg>) -> Self {
        self.args = args;
        self
    }

    pub fn returns(mut self, returns: Returns) -> Self {
        self.returns = Some(returns);
        self
    }

    pub fn return_stack(mut self, stack: Vec<Returns>) -> Self {
        self.return_stack = stack;
        self
    }

    pub fn times(mut self, times: usize) -> Self {
        self.times = Some(times);
        self
    }

    pub fn backend(mut self, backend: MockBackend) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Handle to the installed expectation, once registered.
    pub fn call(&self) -> Option<&Call> {
        self.installed.as_ref().map(|installed| &installed.call)
    }

    /// Returns registered with the expectation before any call happens.
    fn initial_returns(&self) -> Returns {
        match (&self.returns, self.return_stack.last()) {
            (Some(returns), _) => returns.clone(),
            (None, Some(last)) => last.clone(),
            (None, None) => Returns::default(),
        }
    }

    /// Installs the expectation on the operation's own backend or on
    /// `shared`. Registering twice is a no-op, the first expectation and the
    /// remaining return stack are kept.
    pub(crate) fn register(&mut self, shared: &MockBackend) -> MockBackend {
        if self.installed.is_none() {
            let backend = self.backend.clone().unwrap_or_else(|| shared.clone());
            let matchers = self.args.iter().map(Arg::matcher).collect();

            let mut call = backend
                .on(self.name.clone(), matchers)
                .returning(self.initial_returns());

            if let Some(times) = self.times {
                call = call.times(times);
            }

            self.installed = Some(Installed {
                backend,
                call,
                stack: Arc::new(Mutex::new(self.return_stack.clone())),
            });
        } else {
            tracing::debug!(operation = %self.name, "Operation already registered");
        }

        self.installed
            .as_ref()
            .map_or_else(|| shared.clone(), |installed| installed.backend.clone())
    }

    /// Binding consulted by the backend when this operation is called.
    pub(crate) fn bound(&self) -> Option<(&MockBackend, BoundOperation)> {
        self.installed.as_ref().map(|installed| {
            let bound = BoundOperation {
                method: self.name.clone(),
                call: installed.call.clone(),
                stack: installed.stack.clone(),
            };

            (&installed.backend, bound)
        })
    }
}

impl fmt::Debug for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operation")
            .field("name", &self.name)
            .field("args", &self.args)
            .field("returns", &self.returns)
            .field("return_stack", &self.return_stack)
            .field("times", &self.times)
            .field("registered", &self.installed.is_some())
            .finish()
    }
}

/// Which value of an operation a reference points at.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Target {
    Arg(usize),
    Return(usize),
}

/// Index based pointer to a declared argument or return value. Lets a body
/// reuse exactly the value given to the mock instead of repeating it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OperationRef {
    /// Position in [`crate::Test::operations`].
    pub index: usize,
    pub target: Target,
}

impl OperationRef {
    /// Argument `arg` of the first operation.
    pub fn arg(arg: usize) -> Self {
        Self {
            index: 0,
            target: Target::Arg(arg),
        }
    }

    /// Return value `ret` of the first operation.
    pub fn ret(ret: usize) -> Self {
        Self {
            index: 0,
            target: Target::Return(ret),
        }
    }

    /// Points the reference at another operation.
    pub fn of(self, index: usize) -> Self {
        Self { index, ..self }
    }

    /// Looks up the referenced value, failing when any index is out of
    /// bounds or the argument is a matcher with no value.
    pub fn resolve<'a>(&self, operations: &'a [Operation]) -> crate::Result<&'a Value> {
        let operation = operations.get(self.index).ok_or_else(|| {
            Error::InvalidReference(format!(
                "operation {} does not exist, {} declared",
                self.index,
                operations.len()
            ))
        })?;

        match self.target {
            Target::Arg(position) => {
                let arg = operation.args.get(position).ok_or_else(|| {
                    Error::InvalidReference(format!(
                        "{} has no argument {position}, {} declared",
                        operation.name,
                        operation.args.len()
                    ))
                })?;

                arg.value().ok_or_else(|| {
                    Error::InvalidReference(format!(
                        "argument {position} of {} is a matcher without a value",
                        operation.name
                    ))
                })
            }

            Target::Return(position) => {
                let returns = operation
                    .returns
                    .as_ref()
                    .or_else(|| operation.return_stack.last());

                returns.and_then(|returns| returns.get(position)).ok_or_else(|| {
                    Error::InvalidReference(format!(
                        "{} has no return value {position}",
                        operation.name
                    ))
                })
            }
        }
    }

    /// JSON encoding of the referenced value.
    pub fn encode(&self, operations: &[Operation]) -> crate::Result<Vec<u8>> {
        self.resolve(operations)?.encode()
    }
}

/// Reference to argument `arg` of the first operation. Chain
/// [`OperationRef::of`] to pick another operation.
pub fn operation_arg(arg: usize) -> OperationRef {
    OperationRef::arg(arg)
}

/// Reference to return value `ret` of the first operation.
pub fn operation_return(ret: usize) -> OperationRef {
    OperationRef::ret(ret)
}
