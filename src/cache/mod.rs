//! 缓存层：推理结果的内容寻址缓存
//!
//! 规划与定位这两类昂贵的推理调用在执行前先查缓存：key 是由语义输入
//! （指令 / 定位文本 + 页面签名）算出的 Fingerprint。命中时直接复用载荷，
//! 载荷与未命中时的推理响应类型相同，因此缓存对流水线的正确性透明。

pub mod file;
pub mod fingerprint;
pub mod memory;
pub mod traits;

pub use file::FileTaskCache;
pub use fingerprint::{CacheKind, Fingerprint};
pub use memory::{InMemoryTaskCache, NoopTaskCache};
pub use traits::{CacheError, CachedPayload, TaskCache};
