//! Command implementations.

mod info;
mod upload;
mod validate;

pub use info::run_info;
pub use upload::run_upload;
pub use validate::run_validate;
