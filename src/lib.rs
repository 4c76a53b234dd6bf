//! Hufflepuff Todo — task list service with subtasks and batch reordering.

pub mod api;
pub mod config;
pub mod error;
pub mod seed;
pub mod store;
pub mod subtasks;
pub mod todos;
