//! Persisted data model for `Tasklist`.
//!
//! Everything that crosses the durable store boundary lives here: the
//! [`task::Task`] record, its identifier and text rules, and the JSON codec
//! used to read and write stored values.

pub mod codec;
pub mod task;
