pub mod config;
pub mod output;
pub mod source;
pub mod status;
pub mod types;

pub use config::*;
pub use output::*;
pub use source::*;
pub use status::*;
pub use types::*;
