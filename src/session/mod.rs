//! 会话模块
//!
//! 会话 token 的签发、验证和滑动刷新。
//!
//! ## 子模块
//!
//! - **manager**: [`SessionManager`]，签发 / 验证 / 刷新
//! - **policy**: 刷新策略 [`classify`]，纯函数
//! - **clock**: 时间源抽象
//!
//! ## 生命周期
//!
//! ```text
//! issue ──► Fresh ──(进入刷新窗口)──► StaleValid ──resolve──► 重新签发（回到 Fresh）
//!             │                          │
//!             └──────(超过有效期)─────────┴──► Expired（resolve 返回 SessionExpired）
//! ```
//!
//! 状态转换只在调用 `resolve` 时发生，没有后台定时器。

pub mod clock;
pub mod manager;
pub mod policy;

pub use clock::{Clock, ManualClock, SystemClock};
pub use manager::{Refresh, SessionManager};
pub use policy::{SessionState, classify};
