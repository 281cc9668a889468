//! Feature flag sources backed by infrastructure.

pub mod postgres;

pub use postgres::PostgresFlagSource;
