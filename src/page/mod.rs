//! 页面层：被控环境（浏览器 / 移动端页面）的协作者契约
//!
//! 具体驱动不在本 crate 内实现；这里只定义快照类型、Page trait 与一个脚本化的 StaticPage。

pub mod snapshot;
pub mod static_page;
pub mod traits;

pub use snapshot::{ElementInfo, PageSnapshot, Rect};
pub use static_page::{PerformedAction, StaticPage};
pub use traits::{Page, PageError};
