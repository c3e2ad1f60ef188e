//! Core clients and control planes for datashift.
//!
//! The `store` layer talks to the databases: an HTTP client for the
//! Elasticsearch REST API and a `sqlx` pool for `PostgreSQL`, each behind a
//! backend trait. The `control` layer holds the call sequence behind every
//! adapter operation, including the scroll export loop and the SQL statement
//! guards.

pub mod control;
pub mod store;
