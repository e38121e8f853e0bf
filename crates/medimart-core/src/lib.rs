pub mod collection;
pub mod error;
pub mod id;
pub mod models;
pub mod time;
pub mod validation;

pub use collection::Collection;
pub use error::{CoreError, ErrorCategory, Result};
pub use id::{generate_id, validate_id};
pub use models::{Document, Meta};
pub use time::{TimeWindow, now_utc};
