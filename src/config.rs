//! 配置模块
//!
//! 负责解析会话配置和加载 PEM 密钥文件。
//!
//! ## 配置项
//!
//! | 键 | 类型 | 说明 |
//! |---|---|---|
//! | `privateKeyFile` | 字符串 | PEM 私钥路径（签名） |
//! | `publicKeyFile` | 字符串 | PEM 公钥路径（验证） |
//! | `algorithm` | 字符串 | 签名算法，如 `RS256` |
//! | `sessionName` | 字符串 | Session 槽位 / Cookie 名称 |
//! | `sessionTimeout` | 整数 | 签发或刷新时授予的有效期（秒） |
//! | `sessionRefreshInterval` | 整数 | 过期前触发刷新的窗口（秒） |
//!
//! ## 示例
//!
//! ```rust,no_run
//! use authrs_session::config::{KeyPair, SessionSettings};
//! use serde_json::json;
//!
//! let map = json!({
//!     "privateKeyFile": "keys/private.pem",
//!     "publicKeyFile": "keys/public.pem",
//!     "algorithm": "RS256",
//!     "sessionName": "my_app",
//!     "sessionTimeout": 3000,
//!     "sessionRefreshInterval": 300,
//! });
//!
//! let settings = SessionSettings::from_map(map.as_object().unwrap()).unwrap();
//! let keys = KeyPair::load(&settings).unwrap();
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::Duration;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey};
use serde_json::{Map, Value};

use crate::error::{ConfigError, Result};

/// 默认签名算法
pub const DEFAULT_ALGORITHM: JwtAlgorithm = JwtAlgorithm::RS256;
/// 默认 Session 名称
pub const DEFAULT_SESSION_NAME: &str = "secret";
/// 默认会话有效期（秒）
pub const DEFAULT_SESSION_TIMEOUT_SECS: i64 = 3000;
/// 默认刷新窗口（秒）
pub const DEFAULT_REFRESH_INTERVAL_SECS: i64 = 300;

/// 环境变量前缀
const ENV_PREFIX: &str = "AUTHRS_SESSION_";

/// JWT 签名算法
///
/// 只支持非对称算法，token 必须能仅凭公钥验证。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JwtAlgorithm {
    /// RSA-SHA256
    RS256,
    /// RSA-SHA384
    RS384,
    /// RSA-SHA512
    RS512,
    /// RSA-PSS-SHA256
    PS256,
    /// RSA-PSS-SHA384
    PS384,
    /// RSA-PSS-SHA512
    PS512,
    /// ECDSA P-256 SHA256
    ES256,
    /// ECDSA P-384 SHA384
    ES384,
    /// Ed25519
    EdDSA,
}

/// 密钥类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyFamily {
    /// RSA 密钥（RS* 和 PS*）
    Rsa,
    /// 椭圆曲线密钥
    Ec,
    /// Edwards 曲线密钥
    Ed,
}

impl JwtAlgorithm {
    /// JWT 头部中的算法名
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::RS256 => "RS256",
            Self::RS384 => "RS384",
            Self::RS512 => "RS512",
            Self::PS256 => "PS256",
            Self::PS384 => "PS384",
            Self::PS512 => "PS512",
            Self::ES256 => "ES256",
            Self::ES384 => "ES384",
            Self::EdDSA => "EdDSA",
        }
    }

    /// 算法所需的密钥类型
    pub const fn family(&self) -> KeyFamily {
        match self {
            Self::RS256 | Self::RS384 | Self::RS512 => KeyFamily::Rsa,
            Self::PS256 | Self::PS384 | Self::PS512 => KeyFamily::Rsa,
            Self::ES256 | Self::ES384 => KeyFamily::Ec,
            Self::EdDSA => KeyFamily::Ed,
        }
    }

    /// 所有支持的算法
    pub const ALL: [JwtAlgorithm; 9] = [
        Self::RS256,
        Self::RS384,
        Self::RS512,
        Self::PS256,
        Self::PS384,
        Self::PS512,
        Self::ES256,
        Self::ES384,
        Self::EdDSA,
    ];
}

impl FromStr for JwtAlgorithm {
    type Err = ConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        JwtAlgorithm::ALL
            .into_iter()
            .find(|alg| alg.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                ConfigError::invalid(
                    "algorithm",
                    format!("unsupported signing algorithm '{}'", s),
                )
            })
    }
}

impl fmt::Display for JwtAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<JwtAlgorithm> for Algorithm {
    fn from(alg: JwtAlgorithm) -> Self {
        match alg {
            JwtAlgorithm::RS256 => Algorithm::RS256,
            JwtAlgorithm::RS384 => Algorithm::RS384,
            JwtAlgorithm::RS512 => Algorithm::RS512,
            JwtAlgorithm::PS256 => Algorithm::PS256,
            JwtAlgorithm::PS384 => Algorithm::PS384,
            JwtAlgorithm::PS512 => Algorithm::PS512,
            JwtAlgorithm::ES256 => Algorithm::ES256,
            JwtAlgorithm::ES384 => Algorithm::ES384,
            JwtAlgorithm::EdDSA => Algorithm::EdDSA,
        }
    }
}

/// 会话配置
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSettings {
    /// PEM 私钥路径
    pub private_key_file: PathBuf,
    /// PEM 公钥路径
    pub public_key_file: PathBuf,
    /// 签名算法
    pub algorithm: JwtAlgorithm,
    /// Session 槽位名称（Cookie 名称）
    pub session_name: String,
    /// 签发或刷新时授予的有效期
    pub session_timeout: Duration,
    /// 过期前触发刷新的窗口
    pub session_refresh_interval: Duration,
}

impl SessionSettings {
    /// 使用默认的算法、名称和时间参数创建配置
    pub fn new(private_key_file: impl Into<PathBuf>, public_key_file: impl Into<PathBuf>) -> Self {
        Self {
            private_key_file: private_key_file.into(),
            public_key_file: public_key_file.into(),
            algorithm: DEFAULT_ALGORITHM,
            session_name: DEFAULT_SESSION_NAME.to_string(),
            session_timeout: Duration::seconds(DEFAULT_SESSION_TIMEOUT_SECS),
            session_refresh_interval: Duration::seconds(DEFAULT_REFRESH_INTERVAL_SECS),
        }
    }

    /// 设置签名算法
    pub fn with_algorithm(mut self, algorithm: JwtAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// 设置 Session 名称
    pub fn with_session_name(mut self, name: impl Into<String>) -> Self {
        self.session_name = name.into();
        self
    }

    /// 设置会话有效期
    pub fn with_session_timeout(mut self, timeout: Duration) -> Self {
        self.session_timeout = timeout;
        self
    }

    /// 设置刷新窗口
    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.session_refresh_interval = interval;
        self
    }

    /// 从配置映射解析
    ///
    /// 所有键都是必需的，缺失或类型错误时返回的错误会指明对应的键。
    pub fn from_map(map: &Map<String, Value>) -> Result<Self> {
        let settings = Self {
            private_key_file: PathBuf::from(required_str(map, "privateKeyFile")?),
            public_key_file: PathBuf::from(required_str(map, "publicKeyFile")?),
            algorithm: required_str(map, "algorithm")?.parse()?,
            session_name: required_str(map, "sessionName")?.to_string(),
            session_timeout: required_secs(map, "sessionTimeout")?,
            session_refresh_interval: required_secs(map, "sessionRefreshInterval")?,
        };

        settings.validate()?;
        Ok(settings)
    }

    /// 从环境变量加载配置
    ///
    /// 先读取 `.env` 文件（如果存在），然后读取 `AUTHRS_SESSION_*` 变量：
    ///
    /// - `AUTHRS_SESSION_PRIVATE_KEY_FILE`（必需）
    /// - `AUTHRS_SESSION_PUBLIC_KEY_FILE`（必需）
    /// - `AUTHRS_SESSION_ALGORITHM`（默认 `RS256`）
    /// - `AUTHRS_SESSION_NAME`（默认 `secret`）
    /// - `AUTHRS_SESSION_TIMEOUT`（默认 3000）
    /// - `AUTHRS_SESSION_REFRESH_INTERVAL`（默认 300）
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |suffix: &str| lookup(&format!("{}{}", ENV_PREFIX, suffix));
        let required = |suffix: &str| {
            var(suffix).ok_or_else(|| ConfigError::MissingRequired(format!("{ENV_PREFIX}{suffix}")))
        };
        let secs = |suffix: &str, default: i64| -> Result<Duration> {
            let key = format!("{ENV_PREFIX}{suffix}");
            let value = match var(suffix) {
                Some(raw) => raw.trim().parse().map_err(|_| {
                    ConfigError::invalid(&key, format!("expected integer seconds, got '{}'", raw))
                })?,
                None => default,
            };
            Ok(seconds(&key, value)?)
        };

        let mut settings = Self::new(required("PRIVATE_KEY_FILE")?, required("PUBLIC_KEY_FILE")?);
        if let Some(alg) = var("ALGORITHM") {
            settings.algorithm = alg.parse()?;
        }
        if let Some(name) = var("NAME") {
            settings.session_name = name;
        }
        settings.session_timeout = secs("TIMEOUT", DEFAULT_SESSION_TIMEOUT_SECS)?;
        settings.session_refresh_interval =
            secs("REFRESH_INTERVAL", DEFAULT_REFRESH_INTERVAL_SECS)?;

        settings.validate()?;
        Ok(settings)
    }

    /// 校验时间参数
    ///
    /// 刷新窗口必须小于有效期，否则刷新策略永远不会触发。
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        validate_timing(self.session_timeout, self.session_refresh_interval)?;
        if self.session_name.is_empty() {
            return Err(ConfigError::invalid("sessionName", "must not be empty"));
        }
        Ok(())
    }
}

pub(crate) fn validate_timing(
    timeout: Duration,
    refresh_interval: Duration,
) -> std::result::Result<(), ConfigError> {
    if timeout.num_seconds() <= 0 {
        return Err(ConfigError::invalid(
            "sessionTimeout",
            "must be a positive number of seconds",
        ));
    }
    if refresh_interval.num_seconds() < 0 {
        return Err(ConfigError::invalid(
            "sessionRefreshInterval",
            "must not be negative",
        ));
    }
    if refresh_interval >= timeout {
        return Err(ConfigError::invalid(
            "sessionRefreshInterval",
            "must be smaller than sessionTimeout",
        ));
    }
    Ok(())
}

fn required_str<'a>(map: &'a Map<String, Value>, key: &str) -> Result<&'a str> {
    match map.get(key) {
        None | Some(Value::Null) => Err(ConfigError::MissingRequired(key.to_string()).into()),
        Some(Value::String(s)) => Ok(s.as_str()),
        Some(other) => Err(ConfigError::invalid(key, format!("expected string, got {}", other)).into()),
    }
}

fn required_secs(map: &Map<String, Value>, key: &str) -> Result<Duration> {
    let secs = match map.get(key) {
        None | Some(Value::Null) => return Err(ConfigError::MissingRequired(key.to_string()).into()),
        Some(value) => value.as_i64().ok_or_else(|| {
            ConfigError::invalid(key, format!("expected integer seconds, got {}", value))
        })?,
    };
    Ok(seconds(key, secs)?)
}

/// 秒数转换为 `Duration`，超出 chrono 表示范围时报错
fn seconds(key: &str, secs: i64) -> std::result::Result<Duration, ConfigError> {
    Duration::try_seconds(secs)
        .ok_or_else(|| ConfigError::invalid(key, format!("{} seconds is out of range", secs)))
}

/// 签名 / 验证密钥对
#[derive(Clone)]
pub struct KeyPair {
    pub(crate) encoding: EncodingKey,
    pub(crate) decoding: DecodingKey,
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair").finish_non_exhaustive()
    }
}

impl KeyPair {
    /// 读取并解析配置中的两个 PEM 文件
    pub fn load(settings: &SessionSettings) -> Result<Self> {
        let private_pem = read_key_file(&settings.private_key_file)?;
        let public_pem = read_key_file(&settings.public_key_file)?;

        let encoding = encoding_key(settings.algorithm, &private_pem).map_err(|message| {
            ConfigError::InvalidKey {
                path: settings.private_key_file.clone(),
                message,
            }
        })?;
        let decoding = decoding_key(settings.algorithm, &public_pem).map_err(|message| {
            ConfigError::InvalidKey {
                path: settings.public_key_file.clone(),
                message,
            }
        })?;

        Ok(Self { encoding, decoding })
    }

    /// 从内存中的 PEM 数据创建密钥对
    pub fn from_pem(algorithm: JwtAlgorithm, private_pem: &[u8], public_pem: &[u8]) -> Result<Self> {
        let encoding = encoding_key(algorithm, private_pem)
            .map_err(|message| ConfigError::invalid("privateKey", message))?;
        let decoding = decoding_key(algorithm, public_pem)
            .map_err(|message| ConfigError::invalid("publicKey", message))?;
        Ok(Self { encoding, decoding })
    }

    /// 签名密钥
    pub fn encoding_key(&self) -> &EncodingKey {
        &self.encoding
    }

    /// 验证密钥
    pub fn decoding_key(&self) -> &DecodingKey {
        &self.decoding
    }
}

fn read_key_file(path: &Path) -> std::result::Result<Vec<u8>, ConfigError> {
    std::fs::read(path).map_err(|source| ConfigError::KeyFile {
        path: path.to_path_buf(),
        source,
    })
}

fn encoding_key(algorithm: JwtAlgorithm, pem: &[u8]) -> std::result::Result<EncodingKey, String> {
    let key = match algorithm.family() {
        KeyFamily::Rsa => EncodingKey::from_rsa_pem(pem),
        KeyFamily::Ec => EncodingKey::from_ec_pem(pem),
        KeyFamily::Ed => EncodingKey::from_ed_pem(pem),
    };
    key.map_err(|e| format!("not a valid {} private key: {}", algorithm, e))
}

fn decoding_key(algorithm: JwtAlgorithm, pem: &[u8]) -> std::result::Result<DecodingKey, String> {
    let key = match algorithm.family() {
        KeyFamily::Rsa => DecodingKey::from_rsa_pem(pem),
        KeyFamily::Ec => DecodingKey::from_ec_pem(pem),
        KeyFamily::Ed => DecodingKey::from_ed_pem(pem),
    };
    key.map_err(|e| format!("not a valid {} public key: {}", algorithm, e))
}
