//! 会话 Claims 定义

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 会话 token 的负载
///
/// `exp` 是保留字段，由会话管理器在签发和刷新时写入；用户数据序列化在
/// `user` 键下，因此用户数据中的同名字段不会覆盖过期时间。
///
/// 线上格式：
///
/// ```json
/// { "exp": 1700000000, "user": { "name": "alice" } }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionClaims<T> {
    /// 过期时间（Unix 时间戳，秒）
    pub exp: i64,

    /// 用户数据
    pub user: T,
}

impl<T> SessionClaims<T> {
    /// 创建新的 Claims
    pub fn new(user: T, exp: i64) -> Self {
        Self { exp, user }
    }

    /// 过期时间
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }

    /// 相对 `now` 的剩余秒数，已过期时为负数或零
    pub fn remaining(&self, now: i64) -> i64 {
        self.exp - now
    }

    /// 取出用户数据
    pub fn into_user(self) -> T {
        self.user
    }
}
