//! Subtasks — child items of a todo.

pub mod model;
pub mod repository;
pub mod routes;

pub use model::{NewSubtask, Subtask, SubtaskUpdate};
pub use repository::SubtaskRepository;
