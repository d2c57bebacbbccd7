//! Call recording and verification. A [`Mock`] holds a list of expected
//! method calls; mock wrappers report actual calls through
//! [`Mock::method_called`] and get back the declared [`Returns`]. Once the
//! exchange is over, [`Mock::verify`] lists every expectation that was never
//! met and every call nobody expected.
//!
//! Matching works like this:
//!
//! 1. Expectations are scanned in registration order.
//! 2. An expectation matches when the method name is equal, the argument
//!    count is equal and every [`Matcher`] accepts its argument.
//! 3. Expectations registered with [`Call::times`] stop matching once they
//!    have been hit that many times.
//! 4. The first match records the call and hands out its returns.

pub mod backend;

use std::{borrow::Cow, fmt, sync::Arc};

use parking_lot::Mutex;

use crate::{report::Failure, value, Error, Returns, Value};

/// Argument matcher installed with an expectation.
#[derive(Clone, PartialEq)]
pub enum Matcher {
    /// Accepts any argument.
    Anything,

    /// Accepts any argument of the named type, see [`value::type_name`].
    AnyOfType(Cow<'static, str>),

    /// Accepts only an argument with the same type and JSON encoding.
    Exact(Value),
}

impl Matcher {
    pub fn any_of_type<T: ?Sized>() -> Self {
        Matcher::AnyOfType(Cow::Borrowed(value::type_name::<T>()))
    }

    pub fn matches(&self, argument: &Value) -> bool {
        match self {
            Matcher::Anything => true,
            Matcher::AnyOfType(type_name) => argument.type_name() == type_name.as_ref(),
            Matcher::Exact(expected) => expected == argument,
        }
    }
}

impl fmt::Debug for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Matcher::Anything => write!(f, "Anything"),
            Matcher::AnyOfType(type_name) => write!(f, "AnyOfType({type_name})"),
            Matcher::Exact(value) => write!(f, "{value:?}"),
        }
    }
}

/// A single expected call.
#[derive(Debug)]
struct Expectation {
    method: String,
    matchers: Vec<Matcher>,
    returns: Returns,
    times: Option<usize>,
    calls: usize,
}

impl Expectation {
    fn accepts(&self, method: &str, arguments: &[Value]) -> bool {
        self.method == method
            && self.times.map_or(true, |times| self.calls < times)
            && self.matchers.len() == arguments.len()
            && self
                .matchers
                .iter()
                .zip(arguments)
                .all(|(matcher, argument)| matcher.matches(argument))
    }

    fn is_satisfied(&self) -> bool {
        match self.times {
            Some(times) => self.calls == times,
            None => self.calls > 0,
        }
    }
}

#[derive(Debug, Default)]
struct State {
    expectations: Vec<Expectation>,
    unexpected: Vec<(String, String)>,
}

/// Recorder of expected and actual calls. Cloning is cheap and every clone
/// shares the same expectations.
#[derive(Clone, Default)]
pub struct Mock {
    state: Arc<Mutex<State>>,
}

impl Mock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an expected call with no return values. Use the returned
    /// [`Call`] to complete it.
    pub fn on(&self, method: impl Into<String>, matchers: Vec<Matcher>) -> Call {
        let mut state = self.state.lock();
        let method = method.into();

        tracing::trace!(%method, ?matchers, "Registering expectation");

        state.expectations.push(Expectation {
            method,
            matchers,
            returns: Returns::default(),
            times: None,
            calls: 0,
        });

        Call {
            state: self.state.clone(),
            index: state.expectations.len() - 1,
        }
    }

    /// Records a call made by the code under test and returns the values of
    /// the first matching expectation.
    pub fn method_called(&self, method: &str, arguments: &[Value]) -> crate::Result<Returns> {
        let mut state = self.state.lock();

        let matching = state
            .expectations
            .iter_mut()
            .find(|expectation| expectation.accepts(method, arguments));

        if let Some(expectation) = matching {
            expectation.calls += 1;
            tracing::trace!(%method, ?arguments, returns = ?expectation.returns, "Mock called");
            return Ok(expectation.returns.clone());
        }

        let arguments = format_arguments(arguments);
        tracing::debug!(%method, %arguments, "Unexpected mock call");
        state
            .unexpected
            .push((String::from(method), arguments.clone()));

        Err(Error::UnexpectedCall {
            method: String::from(method),
            arguments,
        })
    }

    /// Lists unmet expectations and unexpected calls. An empty list means
    /// the mock saw exactly what it was told to expect.
    pub fn verify(&self) -> Vec<Failure> {
        let state = self.state.lock();

        let unmet = state
            .expectations
            .iter()
            .filter(|expectation| !expectation.is_satisfied())
            .map(|expectation| Failure::UnmetExpectation {
                method: expectation.method.clone(),
                matchers: format!("{:?}", expectation.matchers),
                times: expectation.times,
                calls: expectation.calls,
            });

        let unexpected = state
            .unexpected
            .iter()
            .map(|(method, arguments)| Failure::UnexpectedCall {
                method: method.clone(),
                arguments: arguments.clone(),
            });

        unmet.chain(unexpected).collect()
    }

    /// Panics listing every problem reported by [`Mock::verify`].
    pub fn assert_expectations(&self) {
        let failures = self.verify();

        if !failures.is_empty() {
            let report: Vec<String> = failures.iter().map(ToString::to_string).collect();
            panic!("mock expectations not met:\n{}", report.join("\n"));
        }
    }

    /// Whether `self` and `other` share the same expectations.
    pub fn same(&self, other: &Mock) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }
}

impl fmt::Debug for Mock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mock")
            .field("expectations", &self.state.lock().expectations)
            .finish()
    }
}

/// Handle to an installed expectation. Allows changing what it returns after
/// registration, which is how return stacks are consumed.
#[derive(Clone)]
pub struct Call {
    state: Arc<Mutex<State>>,
    index: usize,
}

impl Call {
    pub fn returning(self, returns: Returns) -> Self {
        self.set_returns(returns);
        self
    }

    /// Expect exactly `times` calls. Further calls become unexpected.
    pub fn times(self, times: usize) -> Self {
        self.state.lock().expectations[self.index].times = Some(times);
        self
    }

    pub fn set_returns(&self, returns: Returns) {
        self.state.lock().expectations[self.index].returns = returns;
    }

    pub fn returns(&self) -> Returns {
        self.state.lock().expectations[self.index].returns.clone()
    }

    /// Whether the next call of `method` with `arguments` would be matched
    /// by this expectation.
    pub fn accepts(&self, method: &str, arguments: &[Value]) -> bool {
        self.state.lock().expectations[self.index].accepts(method, arguments)
    }

    /// Number of calls recorded for this expectation so far.
    pub fn calls(&self) -> usize {
        self.state.lock().expectations[self.index].calls
    }

    /// Whether this handle belongs to `mock`.
    pub fn belongs_to(&self, mock: &Mock) -> bool {
        Arc::ptr_eq(&self.state, &mock.state)
    }
}

impl fmt::Debug for Call {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Call").field("index", &self.index).finish()
    }
}

fn format_arguments(arguments: &[Value]) -> String {
    arguments
        .iter()
        .map(|argument| format!("{argument:?}"))
        .collect::<Vec<_>>()
        .join(", ")
}
