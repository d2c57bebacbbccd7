//! Small users API used as the handler under test.
//!
//! | Route                    | Backend calls                 |
//! |--------------------------|-------------------------------|
//! | `GET /users/{id}`        | `GetUser(id)`                 |
//! | `GET /users?name={name}` | `FindUsers(name)`             |
//! | `POST /users`            | `CreateUser(user)`, `Publish` |
//! | `GET /me`                | `GetUser(1)` if authorized    |
//! | `GET /old/{id}`          | none, `302` to `/users/{id}`  |
//! | `GET /loop`              | none, `302` to itself         |

use std::{convert::Infallible, future::Future, pin::Pin, sync::Arc};

use bytes::Bytes;
use http::{header, Method, StatusCode};
use http_body_util::{combinators::BoxBody, BodyExt};
use hyper::{body::Incoming, service::Service, Request, Response};
use litmus::{empty, json};
use url::form_urlencoded;

use super::store::{EventBus, NewUser, UserStore};

type Body = BoxBody<Bytes, Infallible>;

#[derive(Clone)]
pub struct UsersService {
    store: Arc<dyn UserStore>,
    events: Option<Arc<dyn EventBus>>,
}

impl UsersService {
    pub fn new(store: impl UserStore + 'static) -> Self {
        Self {
            store: Arc::new(store),
            events: None,
        }
    }

    pub fn with_events(mut self, events: impl EventBus + 'static) -> Self {
        self.events = Some(Arc::new(events));
        self
    }
}

impl Service<Request<Incoming>> for UsersService {
    type Response = Response<Body>;

    type Error = Infallible;

    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, request: Request<Incoming>) -> Self::Future {
        let service = self.clone();
        Box::pin(async move { Ok(service.route(request).await) })
    }
}

impl UsersService {
    async fn route(&self, request: Request<Incoming>) -> Response<Body> {
        let path = String::from(request.uri().path());
        let segments: Vec<&str> = path.trim_matches('/').split('/').collect();

        match (request.method().clone(), segments.as_slice()) {
            (Method::GET, ["users", id]) => match id.parse() {
                Ok(id) => self.get_user(id),
                Err(_) => status(StatusCode::BAD_REQUEST),
            },
            (Method::GET, ["users"]) => self.find_users(request.uri().query()),
            (Method::POST, ["users"]) => self.create_user(request).await,
            (Method::GET, ["me"]) => self.me(&request),
            (Method::GET, ["old", id]) => redirect(&format!("/users/{id}")),
            (Method::GET, ["loop"]) => redirect("/loop"),
            _ => status(StatusCode::NOT_FOUND),
        }
    }

    fn get_user(&self, id: u64) -> Response<Body> {
        match self.store.get_user(id) {
            Ok(user) => respond(StatusCode::OK, json(&user)),
            Err(err) => store_error(err),
        }
    }

    fn find_users(&self, query: Option<&str>) -> Response<Body> {
        let name = form_urlencoded::parse(query.unwrap_or_default().as_bytes())
            .find(|(key, _)| key == "name")
            .map(|(_, value)| value.into_owned());

        let Some(name) = name else {
            return status(StatusCode::BAD_REQUEST);
        };

        match self.store.find_users(&name) {
            Ok(users) => respond(StatusCode::OK, json(&users)),
            Err(err) => store_error(err),
        }
    }

    async fn create_user(&self, request: Request<Incoming>) -> Response<Body> {
        let Ok(body) = request.into_body().collect().await else {
            return status(StatusCode::BAD_REQUEST);
        };

        let Ok(new_user) = serde_json::from_slice::<NewUser>(&body.to_bytes()) else {
            return status(StatusCode::BAD_REQUEST);
        };

        let user = match self.store.create_user(&new_user) {
            Ok(user) => user,
            Err(err) => return store_error(err),
        };

        if let Some(events) = &self.events {
            if let Err(err) = events.publish("user.created", user.id) {
                return respond(StatusCode::INTERNAL_SERVER_ERROR, json(&err));
            }
        }

        let mut response = respond(StatusCode::CREATED, json(&user));
        response.headers_mut().insert(
            header::LOCATION,
            format!("/users/{}", user.id).parse().unwrap(),
        );

        response
    }

    fn me(&self, request: &Request<Incoming>) -> Response<Body> {
        let authorized = request
            .headers()
            .get(header::AUTHORIZATION)
            .is_some_and(|value| value == "Bearer token");

        if !authorized {
            return status(StatusCode::UNAUTHORIZED);
        }

        self.get_user(1)
    }
}

fn respond(status: StatusCode, body: Body) -> Response<Body> {
    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "application/json")
        .body(body)
        .unwrap()
}

fn status(status: StatusCode) -> Response<Body> {
    Response::builder().status(status).body(empty()).unwrap()
}

fn redirect(location: &str) -> Response<Body> {
    Response::builder()
        .status(StatusCode::FOUND)
        .header(header::LOCATION, location)
        .body(empty())
        .unwrap()
}

fn store_error(err: String) -> Response<Body> {
    let status = match err.as_str() {
        "conflict" => StatusCode::CONFLICT,
        "not found" => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };

    respond(status, json(&err))
}
