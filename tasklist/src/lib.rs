//! `Tasklist`: a persisted task list kept in sync across contexts.

pub mod binding;
pub mod config;
pub mod storage;
pub mod tasks;
pub mod view;
