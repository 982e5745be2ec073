pub mod admin;
pub mod categories;
pub mod error;
pub mod health;
pub mod items;
pub mod menus;

pub use error::AppError;
