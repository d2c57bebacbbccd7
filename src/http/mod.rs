//! Client side of the exchange: body sources, request construction, the TLS
//! client and its redirect policies.

pub mod body;
pub mod redirect;

pub(crate) mod client;
pub(crate) mod request;
