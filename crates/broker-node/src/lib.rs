//! Library half of the `brokerd` binary, split out so integration tests can build the same
//! `axum::Router` the running server uses without going through `main()`.

pub mod cli;
pub mod server;
