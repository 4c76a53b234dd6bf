//! Todos — model, repository logic, and HTTP routes.

pub mod model;
pub mod repository;
pub mod routes;

pub use model::{NewTodo, PositionUpdate, Todo, TodoUpdate};
pub use repository::TodoRepository;
