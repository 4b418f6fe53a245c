//! # Query API Protocol
//!
//! Low-level pieces of the HTTP Query API used by the [`crate::driver`]
//! connection layer.
//!
//! ## Overview
//!
//! Queries travel as JSON over HTTP. Values are typed JSON objects of the
//! form `{"$type": "Integer", "_value": "42"}` so that integers, temporals,
//! points and bytes survive the trip without loss.
//!
//! ## Submodules
//!
//! - [`wire`] - typed JSON values
//! - [`codec`] - driver values to and from wire values
//! - [`message`] - request and response codecs for run/begin/commit/rollback
//! - [`discovery`] - query endpoint discovery
//! - [`http`] - plain request/response values handed to a transport
//!
//! ## Note
//!
//! Most users should use the connection provider in [`crate::driver`]
//! instead of building requests directly.

pub mod codec;
pub mod discovery;
pub mod http;
pub mod message;
pub mod wire;

pub use codec::IntegerMode;
pub use discovery::DiscoveryInfo;
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use wire::WireValue;
