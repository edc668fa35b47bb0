//! LLM 层：客户端抽象与实现（OpenAI 兼容 / Mock），以及回复中 JSON 块的提取

pub mod json;
pub mod message;
pub mod mock;
pub mod openai;
pub mod traits;

pub use json::{extract_json_block, parse_json_reply};
pub use message::{Message, Role};
pub use mock::MockLlmClient;
pub use openai::OpenAiClient;
pub use traits::{Completion, LlmClient, LlmError, TokenUsage};
