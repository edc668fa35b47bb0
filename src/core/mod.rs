//! 核心层：错误分类与软超时

pub mod error;
pub mod timeout;

pub use error::AgentError;
pub use timeout::with_timeout;
