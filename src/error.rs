//! 统一错误类型模块
//!
//! 提供 authrs-session 中所有操作的错误类型定义。
//!
//! 错误分为几类：
//!
//! - **配置错误** ([`ConfigError`]): 启动时致命，不可恢复
//! - **Token 错误** ([`TokenError`]): Token 格式错误、签名无效或签名失败
//! - **会话错误**: 无会话 ([`Error::NoSession`]) 或会话已过期 ([`Error::SessionExpired`])
//! - **传输错误**: Session 槽位持久化失败
//!
//! 库内部不做任何重试，所有错误直接返回给调用方，由调用方映射为 HTTP 状态码。

use std::path::PathBuf;

use serde::de::DeserializeOwned;
use thiserror::Error;

/// authrs-session 的统一结果类型
pub type Result<T> = std::result::Result<T, Error>;

/// authrs-session 的错误类型
#[derive(Debug, Error)]
pub enum Error {
    /// 配置错误
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Token 相关错误
    #[error("Token error: {0}")]
    Token(#[from] TokenError),

    /// Session 槽位中没有 token
    #[error("no session token present")]
    NoSession,

    /// Token 有效但已过期，附带仍可读取的用户数据
    #[error("session expired at {}", .0.expired_at)]
    SessionExpired(ExpiredSession),

    /// Session 传输层错误
    #[error("Transport error: {0}")]
    Transport(String),
}

impl Error {
    /// 创建一个传输错误
    pub fn transport(msg: impl Into<String>) -> Self {
        Error::Transport(msg.into())
    }

    /// 请求是否应被视为未认证
    ///
    /// 包括：无会话、会话过期、token 格式错误、签名无效。
    /// 签名失败、配置和传输错误属于服务端故障，返回 `false`。
    pub fn is_unauthenticated(&self) -> bool {
        matches!(
            self,
            Error::NoSession
                | Error::SessionExpired(_)
                | Error::Token(TokenError::Malformed(_))
                | Error::Token(TokenError::InvalidSignature)
        )
    }

    /// 如果是过期错误，返回过期会话信息
    pub fn as_expired(&self) -> Option<&ExpiredSession> {
        match self {
            Error::SessionExpired(expired) => Some(expired),
            _ => None,
        }
    }
}

/// Token 相关错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    /// Token 结构无效（段数、base64、JSON 或负载结构）
    #[error("malformed token: {0}")]
    Malformed(String),

    /// 签名验证失败
    #[error("invalid token signature")]
    InvalidSignature,

    /// 签名失败（密钥与算法不匹配或底层签名原语失败）
    #[error("token signing failed: {0}")]
    SigningFailed(String),
}

/// 配置相关错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 缺少必需的配置
    #[error("missing required configuration: {0}")]
    MissingRequired(String),

    /// 无效的配置值
    #[error("invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// 密钥文件无法读取
    #[error("cannot read key file {}: {source}", .path.display())]
    KeyFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// 密钥内容无法解析
    #[error("invalid key in {}: {message}", .path.display())]
    InvalidKey { path: PathBuf, message: String },
}

impl ConfigError {
    pub(crate) fn invalid(key: impl Into<String>, message: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            key: key.into(),
            message: message.into(),
        }
    }
}

/// 过期的会话
///
/// Token 签名和结构都有效，但时间窗口已经结束。保留解码出的用户数据，
/// 方便调用方区分"需要重新登录"和"篡改尝试"。
#[derive(Debug, Clone, PartialEq)]
pub struct ExpiredSession {
    /// 过期时间（Unix 时间戳，秒）
    pub expired_at: i64,
    /// 解码出的用户数据
    pub user: serde_json::Value,
}

impl ExpiredSession {
    /// 将用户数据反序列化为指定类型
    pub fn user_as<T: DeserializeOwned>(&self) -> Option<T> {
        serde_json::from_value(self.user.clone()).ok()
    }
}
