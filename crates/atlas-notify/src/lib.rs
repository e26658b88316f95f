pub mod attention;
pub mod error;
pub mod mapper;
pub mod sink;
pub mod types;

pub use attention::*;
pub use error::*;
pub use mapper::*;
pub use sink::*;
pub use types::*;
