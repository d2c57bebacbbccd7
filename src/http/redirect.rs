//! Redirect policies for the test client. The default is to never follow, so
//! a handler answering `302 Found` is observed as exactly that.

use std::{fmt, sync::Arc};

use http::StatusCode;
use url::Url;

/// How the client reacts to a `3xx` response carrying a `Location` header.
#[derive(Clone, Default)]
pub enum Redirect {
    /// Return the redirect response as is.
    #[default]
    None,

    /// Follow up to [`crate::Config::max_redirects`] hops.
    Follow,

    /// Follow up to the given number of hops.
    Limited(usize),

    /// Let a function decide on every hop.
    Custom(Arc<dyn Fn(&Attempt<'_>) -> Action + Send + Sync>),
}

impl Redirect {
    pub fn custom<F>(policy: F) -> Self
    where
        F: Fn(&Attempt<'_>) -> Action + Send + Sync + 'static,
    {
        Redirect::Custom(Arc::new(policy))
    }

    pub(crate) fn check(&self, attempt: &Attempt<'_>, max_redirects: usize) -> Action {
        match self {
            Redirect::None => Action::Stop,
            Redirect::Follow => limit(attempt, max_redirects),
            Redirect::Limited(max) => limit(attempt, *max),
            Redirect::Custom(policy) => policy(attempt),
        }
    }
}

fn limit(attempt: &Attempt<'_>, max: usize) -> Action {
    if attempt.previous.len() > max {
        Action::Error(format!("stopped after {max} redirects"))
    } else {
        Action::Follow
    }
}

impl fmt::Debug for Redirect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Redirect::None => write!(f, "None"),
            Redirect::Follow => write!(f, "Follow"),
            Redirect::Limited(max) => f.debug_tuple("Limited").field(max).finish(),
            Redirect::Custom(_) => write!(f, "Custom"),
        }
    }
}

/// A redirect the client is about to follow.
#[derive(Debug)]
pub struct Attempt<'a> {
    pub(crate) status: StatusCode,
    pub(crate) next: &'a Url,
    pub(crate) previous: &'a [Url],
}

impl Attempt<'_> {
    /// Status of the response that asked for the redirect.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Where the redirect points to.
    pub fn url(&self) -> &Url {
        self.next
    }

    /// URLs already requested, oldest first.
    pub fn previous(&self) -> &[Url] {
        self.previous
    }
}

/// Decision of a [`Redirect`] policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Follow,

    /// Stop and return the redirect response.
    Stop,

    /// Abort the test.
    Error(String),
}
