//! Backend dependencies of the users service and their mock wrappers.

use litmus::{values, MockBackend, Returns, Value};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct User {
    pub id: u64,
    pub name: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct NewUser {
    pub name: String,
}

impl User {
    pub fn new(id: u64, name: &str) -> Self {
        Self {
            id,
            name: String::from(name),
        }
    }
}

impl NewUser {
    pub fn new(name: &str) -> Self {
        Self {
            name: String::from(name),
        }
    }
}

pub trait UserStore: Send + Sync {
    fn get_user(&self, id: u64) -> Result<User, String>;

    fn find_users(&self, name: &str) -> Result<Vec<User>, String>;

    fn create_user(&self, user: &NewUser) -> Result<User, String>;
}

pub trait EventBus: Send + Sync {
    fn publish(&self, topic: &str, id: u64) -> Result<(), String>;
}

/// [`UserStore`] answering with whatever the running test declared.
#[derive(Clone, Default)]
pub struct MockUserStore {
    pub backend: MockBackend,
}

impl MockUserStore {
    pub fn new(backend: &MockBackend) -> Self {
        Self {
            backend: backend.clone(),
        }
    }

    /// Calls `method` and splits the conventional `(value, error)` pair.
    fn call(&self, method: &str, arguments: Vec<Value>) -> Result<Returns, String> {
        let returns = self
            .backend
            .method_called(method, arguments)
            .map_err(|err| err.to_string())?;

        match returns.error(1) {
            Some(err) => Err(err),
            None => Ok(returns),
        }
    }
}

impl UserStore for MockUserStore {
    fn get_user(&self, id: u64) -> Result<User, String> {
        self.call("GetUser", values![id])?
            .decode(0)
            .map_err(|err| err.to_string())
    }

    fn find_users(&self, name: &str) -> Result<Vec<User>, String> {
        self.call("FindUsers", values![name])?
            .decode(0)
            .map_err(|err| err.to_string())
    }

    fn create_user(&self, user: &NewUser) -> Result<User, String> {
        self.call("CreateUser", values![user])?
            .decode(0)
            .map_err(|err| err.to_string())
    }
}

#[derive(Clone, Default)]
pub struct MockEventBus {
    pub backend: MockBackend,
}

impl EventBus for MockEventBus {
    fn publish(&self, topic: &str, id: u64) -> Result<(), String> {
        let returns = self
            .backend
            .method_called("Publish", values![topic, id])
            .map_err(|err| err.to_string())?;

        match returns.error(0) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
