//! `SQLite` backend: connection pooling, migrations, repositories, row types.

pub mod connection;
pub mod migrations;
pub mod repositories;
pub mod row_types;
