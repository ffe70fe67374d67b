//! 刷新策略
//!
//! 会话状态不单独存储，每次都由当前时间和 `exp` 重新计算：
//!
//! ```text
//!            remaining = exp - now
//!  Expired   remaining <= 0
//!  Fresh     remaining >= timeout - refresh_interval
//!  StaleValid 其余情况（0 < remaining < timeout - refresh_interval）
//! ```

/// 会话状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// 仍在有效期前段，无需任何操作
    Fresh,
    /// 有效但已进入刷新窗口，需要重新签发
    StaleValid,
    /// 已过期
    Expired,
}

impl SessionState {
    /// 日志中使用的名称
    pub const fn as_str(&self) -> &'static str {
        match self {
            SessionState::Fresh => "fresh",
            SessionState::StaleValid => "stale",
            SessionState::Expired => "expired",
        }
    }
}

/// 根据时间关系判断会话状态
///
/// 所有参数单位都是秒。先判断过期，因此即使 `refresh_interval >= timeout`
/// 这种无效配置也不会让过期的 token 被当作 `Fresh`。
pub fn classify(now: i64, exp: i64, timeout: i64, refresh_interval: i64) -> SessionState {
    let remaining = exp.saturating_sub(now);

    if remaining <= 0 {
        SessionState::Expired
    } else if remaining >= timeout.saturating_sub(refresh_interval) {
        SessionState::Fresh
    } else {
        SessionState::StaleValid
    }
}
