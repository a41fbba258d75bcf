pub mod connection;
pub mod gmail;
pub mod migrate;
pub mod queries;
