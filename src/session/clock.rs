//! 时间源抽象
//!
//! 会话管理器通过 [`Clock`] 获取当前时间，测试中可以用 [`ManualClock`]
//! 代替真实时钟，无需 sleep 即可推进时间。

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Duration, Utc};

/// 当前时间提供者
pub trait Clock: Send + Sync {
    /// 当前 UTC 时间
    fn now(&self) -> DateTime<Utc>;

    /// 当前 Unix 时间戳（秒）
    fn unix_timestamp(&self) -> i64 {
        self.now().timestamp()
    }
}

/// 系统时钟
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// 手动控制的时钟
///
/// 以秒为精度，可在多个线程之间共享（通常包在 `Arc` 里）。
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    /// 从指定的 Unix 时间戳开始
    pub fn new(timestamp: i64) -> Self {
        Self {
            now: AtomicI64::new(timestamp),
        }
    }

    /// 从当前系统时间开始
    pub fn starting_now() -> Self {
        Self::new(Utc::now().timestamp())
    }

    /// 设置当前时间
    pub fn set(&self, timestamp: i64) {
        self.now.store(timestamp, Ordering::SeqCst);
    }

    /// 推进时间
    pub fn advance(&self, by: Duration) {
        self.now.fetch_add(by.num_seconds(), Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.unix_timestamp(), 0).unwrap_or_default()
    }

    fn unix_timestamp(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }

    fn unix_timestamp(&self) -> i64 {
        (**self).unix_timestamp()
    }
}
