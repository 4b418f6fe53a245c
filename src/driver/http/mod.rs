//! HTTP 연결 계층
//!
//! - `transport`: HTTP 송수신 트레이트와 reqwest 구현
//! - `connection`: Query API 연결

mod connection;
mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use connection::{ErrorHandler, HttpConnection};
pub use transport::{HttpTransport, ReqwestTransport};
