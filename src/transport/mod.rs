//! Session 传输层
//!
//! 会话管理器只把传输层当作一个按名称寻址的键值槽位，其中 `"token"` 键保存
//! 当前 token。槽位如何持久化、如何保护（Cookie 签名、存储后端）由具体实现决定。
//!
//! ## 实现
//!
//! - [`MemoryTransport`] / [`MemorySlot`]: 进程内存储，用于测试和嵌入
//! - [`CookieJar`](cookie::CookieJar): 基于 HMAC 签名 Cookie 的传输层

pub mod cookie;

use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::error::Result;

pub use cookie::{CookieJar, CookieKey, CookieOptions, CookieSlot, SameSite, SecureCookie};

/// 槽位中保存 token 的键
pub const TOKEN_KEY: &str = "token";

/// 单个客户端的会话槽位
pub trait SessionSlot {
    /// 读取值，不存在时返回 `None`
    fn get(&self, key: &str) -> Option<&Value>;

    /// 写入值（覆盖旧值）
    fn set(&mut self, key: &str, value: Value);

    /// 持久化槽位
    fn save(&mut self) -> Result<()>;
}

/// 按名称获取会话槽位
pub trait SessionTransport {
    /// 获取指定名称的槽位，不存在时创建空槽位
    fn slot(&mut self, name: &str) -> &mut dyn SessionSlot;
}

/// 内存会话槽位
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemorySlot {
    values: Map<String, Value>,
    saves: usize,
}

impl MemorySlot {
    /// 创建空槽位
    pub fn new() -> Self {
        Self::default()
    }

    /// 当前保存的 token
    pub fn token(&self) -> Option<&str> {
        self.values.get(TOKEN_KEY).and_then(Value::as_str)
    }

    /// `save` 被调用的次数
    pub fn save_count(&self) -> usize {
        self.saves
    }
}

impl SessionSlot for MemorySlot {
    fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    fn set(&mut self, key: &str, value: Value) {
        self.values.insert(key.to_string(), value);
    }

    fn save(&mut self) -> Result<()> {
        self.saves += 1;
        Ok(())
    }
}

/// 内存传输层
#[derive(Debug, Clone, Default)]
pub struct MemoryTransport {
    slots: HashMap<String, MemorySlot>,
}

impl MemoryTransport {
    /// 创建空的传输层
    pub fn new() -> Self {
        Self::default()
    }

    /// 查看槽位（不创建）
    pub fn peek(&self, name: &str) -> Option<&MemorySlot> {
        self.slots.get(name)
    }
}

impl SessionTransport for MemoryTransport {
    fn slot(&mut self, name: &str) -> &mut dyn SessionSlot {
        self.slots.entry(name.to_string()).or_default()
    }
}
