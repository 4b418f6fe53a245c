//! # Query API Messages
//!
//! Request codecs build headers and bodies for run, begin, commit and
//! rollback. Response codecs classify what comes back.
//!
//! | Operation | Method | Path |
//! |-----------|--------|------|
//! | run (auto-commit) | `POST` | `Q` |
//! | begin | `POST` | `Q/tx` |
//! | run (in transaction) | `POST` | `Q/tx/<id>` |
//! | commit | `POST` | `Q/tx/<id>/commit` |
//! | rollback | `DELETE` | `Q/tx/<id>` |
//!
//! `Q` is the discovered query URL with the database name filled in.

pub mod request;
pub mod response;

pub use request::{
    authorization_header, BeginRequestCodec, CommitRequestCodec, RequestCodec, RollbackRequestCodec,
    RunRequestCodec, QUERY_ACCEPT, QUERY_CONTENT_TYPE,
};
pub use response::{BeginResponseCodec, CommitResponseCodec, RollbackResponseCodec, RunResponseCodec};
