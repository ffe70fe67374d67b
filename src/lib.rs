//! # authrs-session
//!
//! 绑定到 HTTP 客户端会话的签名 JWT：签发、验证和透明刷新。
//!
//! ## 功能特性
//!
//! - **Token 编解码**: 使用非对称算法（RSA / RSA-PSS / ECDSA / Ed25519）签名和验证
//! - **会话生命周期**: 签发时写入 `exp`，验证时按滑动窗口自动续期
//! - **显式过期**: 过期的 token 返回 `SessionExpired`，同时保留解码出的用户数据
//! - **可插拔传输层**: 内存槽位和 HMAC 签名 Cookie
//!
//! ## 刷新策略
//!
//! 设 `remaining = exp - now`：
//!
//! - `remaining >= sessionTimeout - sessionRefreshInterval`: 不做任何操作
//! - `0 < remaining < sessionTimeout - sessionRefreshInterval`: 重新签发并覆盖槽位
//! - `remaining <= 0`: 返回 [`Error::SessionExpired`]，槽位不变
//!
//! ## 示例
//!
//! ```rust,no_run
//! use authrs_session::{SessionManager, SessionSettings};
//! use authrs_session::transport::{CookieJar, CookieKey};
//! use chrono::Duration;
//! use serde_json::{Value, json};
//!
//! let settings = SessionSettings::new("keys/private.pem", "keys/public.pem")
//!     .with_session_name("my_app")
//!     .with_session_timeout(Duration::minutes(50))
//!     .with_refresh_interval(Duration::minutes(5));
//! let manager = SessionManager::load(settings).unwrap();
//! let key = CookieKey::generate().unwrap();
//!
//! // 登录：签发 token 写入 Cookie
//! let mut jar = CookieJar::from_request(None, key.clone());
//! manager.issue_in(&json!({ "user_id": 42 }), &mut jar).unwrap();
//! let set_cookie = jar.set_cookie_headers();
//!
//! // 后续请求：验证并按需刷新
//! let mut jar = CookieJar::from_request(Some("my_app=..."), key);
//! match manager.resolve_in::<Value>(&mut jar) {
//!     Ok(claims) => println!("user {}", claims.user["user_id"]),
//!     Err(e) if e.is_unauthenticated() => println!("401: {}", e),
//!     Err(e) => println!("500: {}", e),
//! }
//! ```

pub mod config;
pub mod error;
pub mod session;
pub mod token;
pub mod transport;

pub use error::{ConfigError, Error, ExpiredSession, Result, TokenError};

// ============================================================================
// 配置相关导出
// ============================================================================

pub use config::{JwtAlgorithm, KeyPair, SessionSettings};

// ============================================================================
// 会话相关导出
// ============================================================================

pub use session::{Clock, ManualClock, Refresh, SessionManager, SessionState, SystemClock, classify};

// ============================================================================
// Token 相关导出
// ============================================================================

pub use token::{SessionClaims, TokenCodec, decode_claims, encode_claims};

// ============================================================================
// 传输层导出
// ============================================================================

pub use transport::{MemorySlot, MemoryTransport, SessionSlot, SessionTransport, TOKEN_KEY};
