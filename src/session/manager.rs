//! 会话生命周期管理

use chrono::Duration;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};
use tracing::debug;

use crate::config::{KeyPair, SessionSettings, validate_timing};
use crate::error::{Error, ExpiredSession, Result, TokenError};
use crate::session::clock::{Clock, SystemClock};
use crate::session::policy::{SessionState, classify};
use crate::token::{SessionClaims, TokenCodec};
use crate::transport::{SessionSlot, SessionTransport, TOKEN_KEY};

/// 刷新策略的执行结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Refresh {
    /// 仍在 Fresh 区间，槽位未改动
    Unchanged,
    /// 已进入刷新窗口，新 token 已写入槽位
    Reissued {
        /// 新 token
        token: String,
        /// 新的过期时间
        exp: i64,
    },
}

/// 会话管理器
///
/// 负责签发、验证和滑动刷新会话 token。每个实例拥有自己的配置和密钥，
/// 可以同时存在多个独立配置的实例。
///
/// 管理器本身不保存任何客户端状态，可以在请求处理线程之间共享。
///
/// # 并发
///
/// 同一个槽位上的并发请求如果同时进入刷新窗口，会各自签发带有不同 `exp`
/// 的新 token 并覆盖槽位，最后写入的一方生效。会话按单客户端使用设计，
/// 这里不做额外协调。
#[derive(Debug)]
pub struct SessionManager<C = SystemClock> {
    settings: SessionSettings,
    codec: TokenCodec,
    clock: C,
}

impl SessionManager<SystemClock> {
    /// 使用配置和已加载的密钥创建管理器
    pub fn new(settings: SessionSettings, keys: KeyPair) -> Result<Self> {
        settings.validate()?;
        let codec = TokenCodec::new(settings.algorithm, keys);

        Ok(Self {
            settings,
            codec,
            clock: SystemClock,
        })
    }

    /// 使用配置创建管理器，并从配置的路径加载密钥
    pub fn load(settings: SessionSettings) -> Result<Self> {
        let keys = KeyPair::load(&settings)?;
        Self::new(settings, keys)
    }

    /// 从配置映射创建管理器
    ///
    /// 配置项见 [`config`](crate::config) 模块。
    pub fn from_map(map: &Map<String, Value>) -> Result<Self> {
        Self::load(SessionSettings::from_map(map)?)
    }

    /// 从环境变量创建管理器
    pub fn from_env() -> Result<Self> {
        Self::load(SessionSettings::from_env()?)
    }
}

impl<C: Clock> SessionManager<C> {
    /// 替换时间源
    pub fn with_clock<D: Clock>(self, clock: D) -> SessionManager<D> {
        SessionManager {
            settings: self.settings,
            codec: self.codec,
            clock,
        }
    }

    /// 当前配置
    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    /// Token 编解码器
    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// 更新有效期和刷新窗口
    ///
    /// 之后的签发和刷新都使用新值，已签发 token 的 `exp` 不变。
    pub fn set_timing(&mut self, timeout: Duration, refresh_interval: Duration) -> Result<()> {
        validate_timing(timeout, refresh_interval)?;
        self.settings.session_timeout = timeout;
        self.settings.session_refresh_interval = refresh_interval;
        Ok(())
    }

    /// 以当前时间和配置判断 `exp` 所处的状态
    pub fn state_of(&self, exp: i64) -> SessionState {
        classify(
            self.clock.unix_timestamp(),
            exp,
            self.settings.session_timeout.num_seconds(),
            self.settings.session_refresh_interval.num_seconds(),
        )
    }

    /// 签发 token 并写入槽位
    ///
    /// `exp = now + session_timeout`。编码成功后写入槽位的 `"token"` 键并
    /// 调用一次 `save`；编码失败时槽位不会被修改。
    pub fn issue<T>(&self, user: &T, slot: &mut dyn SessionSlot) -> Result<String>
    where
        T: Serialize + ?Sized,
    {
        let exp = self.expiry_from_now();
        let token = self.codec.encode(&SessionClaims::new(user, exp))?;

        slot.set(TOKEN_KEY, Value::String(token.clone()));
        slot.save()?;

        debug!(session = %self.settings.session_name, exp, "session token issued");
        Ok(token)
    }

    /// 在传输层中按配置的 Session 名称签发
    pub fn issue_in<T>(&self, user: &T, transport: &mut dyn SessionTransport) -> Result<String>
    where
        T: Serialize + ?Sized,
    {
        self.issue(user, transport.slot(&self.settings.session_name))
    }

    /// 读取并验证槽位中的 token，必要时滑动刷新
    ///
    /// - 槽位中没有 token（或不是字符串）时返回 [`Error::NoSession`]
    /// - 签名或结构无效时返回 [`Error::Token`]
    /// - 已过期时返回 [`Error::SessionExpired`]，其中带有解码出的用户数据，槽位保持不变
    /// - 进入刷新窗口时重新签发并覆盖槽位，返回的 Claims 带有新的 `exp`
    pub fn resolve<T: DeserializeOwned>(
        &self,
        slot: &mut dyn SessionSlot,
    ) -> Result<SessionClaims<T>> {
        let token = match slot.get(TOKEN_KEY) {
            Some(Value::String(token)) => token.clone(),
            _ => return Err(Error::NoSession),
        };

        let claims: SessionClaims<Value> = self.codec.decode(&token)?;

        if self.state_of(claims.exp) == SessionState::Expired {
            return Err(self.expired(claims.exp, claims.user));
        }

        let user: T = serde_json::from_value(claims.user.clone()).map_err(|e| {
            Error::Token(TokenError::Malformed(format!(
                "unexpected session payload: {}",
                e
            )))
        })?;

        let exp = match self.refresh(&claims, slot)? {
            Refresh::Unchanged => claims.exp,
            Refresh::Reissued { exp, .. } => exp,
        };

        Ok(SessionClaims::new(user, exp))
    }

    /// 在传输层中按配置的 Session 名称读取
    pub fn resolve_in<T: DeserializeOwned>(
        &self,
        transport: &mut dyn SessionTransport,
    ) -> Result<SessionClaims<T>> {
        self.resolve(transport.slot(&self.settings.session_name))
    }

    /// 对已解码的 Claims 执行刷新策略
    ///
    /// 有效期和刷新窗口每次都从当前配置读取，而不是签发时的值。
    pub fn refresh<T: Serialize>(
        &self,
        claims: &SessionClaims<T>,
        slot: &mut dyn SessionSlot,
    ) -> Result<Refresh> {
        let state = self.state_of(claims.exp);
        debug!(
            session = %self.settings.session_name,
            exp = claims.exp,
            state = state.as_str(),
            "session state classified"
        );

        match state {
            SessionState::Fresh => Ok(Refresh::Unchanged),
            SessionState::Expired => {
                let user = serde_json::to_value(&claims.user).map_err(|e| {
                    Error::Token(TokenError::Malformed(format!(
                        "unserializable session payload: {}",
                        e
                    )))
                })?;
                Err(self.expired(claims.exp, user))
            }
            SessionState::StaleValid => {
                let exp = self.expiry_from_now();
                let token = self.codec.encode(&SessionClaims::new(&claims.user, exp))?;

                slot.set(TOKEN_KEY, Value::String(token.clone()));
                slot.save()?;

                debug!(
                    session = %self.settings.session_name,
                    old_exp = claims.exp,
                    exp,
                    "session token refreshed"
                );
                Ok(Refresh::Reissued { token, exp })
            }
        }
    }

    fn expiry_from_now(&self) -> i64 {
        self.clock.unix_timestamp() + self.settings.session_timeout.num_seconds()
    }

    fn expired(&self, exp: i64, user: Value) -> Error {
        debug!(session = %self.settings.session_name, exp, "session expired");
        Error::SessionExpired(ExpiredSession {
            expired_at: exp,
            user,
        })
    }
}
