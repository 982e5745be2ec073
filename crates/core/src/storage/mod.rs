mod error;
mod http_mapping;
mod traits;

pub use error::{ErrorKind, RepositoryError, Result};
pub use http_mapping::{error_kind_to_status_code, repository_error_to_status_code};
pub use traits::{CategoryRepository, ItemRepository, MenuRepository};
