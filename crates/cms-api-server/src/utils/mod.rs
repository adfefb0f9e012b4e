pub mod error;
pub mod sanitize;

pub use error::ApiError;
pub use sanitize::{sanitize_html_class, sanitize_token_list};
