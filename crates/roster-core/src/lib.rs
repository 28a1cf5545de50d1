mod error;
mod model;
mod repository;
mod seed;
mod service;

pub use error::*;
pub use model::*;
pub use repository::*;
pub use seed::*;
pub use service::*;
