//! factlog - append-only fact logs with folded state, served over HTTP
//!
//! A factlog is a set of named dbs, each an ordered list of immutable
//! facts. Recording a fact folds it into the db's state; a record is
//! rejected unless it claims the db's next age.

pub mod cli;
pub mod client;
pub mod config;
pub mod db;
pub mod http_server;
pub mod store;
