mod models;
mod service;

pub use models::Category;
pub use service::CategoryService;
