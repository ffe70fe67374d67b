//! 签名 Cookie 传输层
//!
//! 每个会话槽位保存为一个 Cookie，值是槽位内容的 JSON，使用 HMAC-SHA256 签名：
//!
//! ```text
//! name=base64url(json).base64url(hmac)
//! ```
//!
//! 签名无效的 Cookie 会被当作空槽位，会话管理器随后返回
//! [`Error::NoSession`](crate::Error::NoSession)。
//!
//! ## 使用示例
//!
//! ```rust
//! use authrs_session::transport::{CookieJar, CookieKey, SessionSlot, SessionTransport};
//!
//! let key = CookieKey::generate().unwrap();
//!
//! // 第一个请求：没有 Cookie
//! let mut jar = CookieJar::from_request(None, key.clone());
//! let slot = jar.slot("my_app");
//! slot.set("token", "abc".into());
//! slot.save().unwrap();
//!
//! let headers = jar.set_cookie_headers();
//! assert!(headers[0].starts_with("my_app="));
//!
//! // 下一个请求带上浏览器回传的 Cookie
//! let cookie = jar.request_cookie_header().unwrap();
//! let mut next = CookieJar::from_request(Some(&cookie), key);
//! assert_eq!(next.slot("my_app").get("token").unwrap(), "abc");
//! ```

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::time::Duration;

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use hmac::{Hmac, Mac};
use rand::{TryRngCore, rngs::OsRng};
use serde_json::{Map, Value};
use sha2::Sha256;

use crate::error::{Error, Result};
use crate::transport::{SessionSlot, SessionTransport};

type HmacSha256 = Hmac<Sha256>;

/// 签名分隔符
const SIGNATURE_SEPARATOR: &str = ".";

/// 随机生成的 Cookie 密钥长度（字节）
const GENERATED_KEY_LENGTH: usize = 64;

/// SameSite Cookie 属性
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SameSite {
    /// 严格模式：Cookie 只在同站请求时发送
    Strict,
    /// 宽松模式：允许顶级导航的跨站请求
    #[default]
    Lax,
    /// 无限制：所有请求都发送 Cookie（需要 Secure 属性）
    None,
}

impl fmt::Display for SameSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SameSite::Strict => write!(f, "Strict"),
            SameSite::Lax => write!(f, "Lax"),
            SameSite::None => write!(f, "None"),
        }
    }
}

/// Cookie 签名密钥
#[derive(Clone)]
pub struct CookieKey(Vec<u8>);

impl fmt::Debug for CookieKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CookieKey(..)")
    }
}

impl CookieKey {
    /// 使用已有的密钥（推荐至少 32 字节）
    pub fn from_bytes(key: impl Into<Vec<u8>>) -> Self {
        Self(key.into())
    }

    /// 使用操作系统 CSPRNG 生成 64 字节随机密钥
    ///
    /// 密钥只存在于当前进程，重启后旧 Cookie 全部失效。
    pub fn generate() -> Result<Self> {
        let mut bytes = vec![0u8; GENERATED_KEY_LENGTH];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|e| Error::transport(format!("random key generation failed: {:?}", e)))?;
        Ok(Self(bytes))
    }

    fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// 写出 Cookie 时使用的属性
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieOptions {
    /// Path 属性
    pub path: Option<String>,
    /// Domain 属性
    pub domain: Option<String>,
    /// Max-Age 属性
    pub max_age: Option<Duration>,
    /// Secure 属性（仅通过 HTTPS 发送）
    pub secure: bool,
    /// HttpOnly 属性（防止 JavaScript 访问）
    pub http_only: bool,
    /// SameSite 属性
    pub same_site: SameSite,
}

impl Default for CookieOptions {
    fn default() -> Self {
        Self {
            path: Some("/".to_string()),
            domain: None,
            max_age: Some(Duration::from_secs(86400 * 30)),
            secure: false,
            http_only: true,
            same_site: SameSite::Lax,
        }
    }
}

/// 安全 Cookie 结构
///
/// 封装 Cookie 的所有安全相关属性，用于生成 `Set-Cookie` 头
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecureCookie {
    /// Cookie 名称
    pub name: String,
    /// Cookie 值
    pub value: String,
    /// Cookie 属性
    pub options: CookieOptions,
}

impl SecureCookie {
    /// 使用默认属性创建 Cookie
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            options: CookieOptions::default(),
        }
    }

    /// 设置属性
    pub fn with_options(mut self, options: CookieOptions) -> Self {
        self.options = options;
        self
    }

    /// 生成 Set-Cookie 头值
    ///
    /// ```rust
    /// use authrs_session::transport::SecureCookie;
    ///
    /// let header = SecureCookie::new("session", "abc123").to_header_value();
    /// assert!(header.contains("session=abc123"));
    /// assert!(header.contains("HttpOnly"));
    /// ```
    pub fn to_header_value(&self) -> String {
        let options = &self.options;
        let mut parts = vec![format!("{}={}", self.name, self.value)];

        if options.http_only {
            parts.push("HttpOnly".to_string());
        }

        if options.secure {
            parts.push("Secure".to_string());
        }

        parts.push(format!("SameSite={}", options.same_site));

        if let Some(ref max_age) = options.max_age {
            parts.push(format!("Max-Age={}", max_age.as_secs()));
        }

        if let Some(ref path) = options.path {
            parts.push(format!("Path={}", path));
        }

        if let Some(ref domain) = options.domain {
            parts.push(format!("Domain={}", domain));
        }

        parts.join("; ")
    }
}

/// 签名 Cookie 值
///
/// 返回格式为 `base64(value).base64(signature)`
pub fn sign_cookie(value: &str, key: &CookieKey) -> Result<String> {
    let encoded_value = URL_SAFE_NO_PAD.encode(value.as_bytes());

    let mut mac = HmacSha256::new_from_slice(key.as_bytes())
        .map_err(|e| Error::transport(format!("invalid cookie key: {}", e)))?;
    mac.update(encoded_value.as_bytes());
    let signature = mac.finalize().into_bytes();
    let encoded_signature = URL_SAFE_NO_PAD.encode(signature);

    Ok(format!(
        "{}{}{}",
        encoded_value, SIGNATURE_SEPARATOR, encoded_signature
    ))
}

/// 验证签名的 Cookie 值
///
/// 签名有效时返回原始值
pub fn verify_cookie(signed_value: &str, key: &CookieKey) -> Result<String> {
    let (encoded_value, encoded_signature) = signed_value
        .rsplit_once(SIGNATURE_SEPARATOR)
        .ok_or_else(|| Error::transport("invalid signed cookie format"))?;

    let mut mac = HmacSha256::new_from_slice(key.as_bytes())
        .map_err(|e| Error::transport(format!("invalid cookie key: {}", e)))?;
    mac.update(encoded_value.as_bytes());

    let expected_signature = URL_SAFE_NO_PAD
        .decode(encoded_signature)
        .map_err(|_| Error::transport("invalid signature encoding"))?;

    mac.verify_slice(&expected_signature)
        .map_err(|_| Error::transport("cookie signature verification failed"))?;

    let value_bytes = URL_SAFE_NO_PAD
        .decode(encoded_value)
        .map_err(|_| Error::transport("invalid value encoding"))?;

    String::from_utf8(value_bytes).map_err(|_| Error::transport("invalid UTF-8 in cookie value"))
}

/// 解析请求中的 `Cookie` 头
fn parse_cookie_header(header: &str) -> HashMap<String, String> {
    header
        .split(';')
        .filter_map(|pair| {
            let (name, value) = pair.split_once('=')?;
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            Some((name.to_string(), value.trim().to_string()))
        })
        .collect()
}

/// 单个 Cookie 对应的会话槽位
#[derive(Debug, Clone)]
pub struct CookieSlot {
    name: String,
    key: CookieKey,
    values: Map<String, Value>,
    signed: Option<String>,
}

impl CookieSlot {
    fn open(name: &str, key: &CookieKey, raw: Option<&str>) -> Self {
        let values = raw
            .and_then(|raw| match decode_slot(raw, key) {
                Ok(values) => Some(values),
                Err(e) => {
                    tracing::warn!(cookie = %name, error = %e, "discarding unverifiable session cookie");
                    None
                }
            })
            .unwrap_or_default();

        Self {
            name: name.to_string(),
            key: key.clone(),
            values,
            signed: None,
        }
    }

    /// Cookie 名称
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 最近一次 `save` 产生的签名值
    pub fn signed_value(&self) -> Option<&str> {
        self.signed.as_deref()
    }
}

fn decode_slot(raw: &str, key: &CookieKey) -> Result<Map<String, Value>> {
    let json = verify_cookie(raw, key)?;
    serde_json::from_str(&json).map_err(|e| Error::transport(format!("invalid cookie payload: {}", e)))
}

impl SessionSlot for CookieSlot {
    fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    fn set(&mut self, key: &str, value: Value) {
        self.values.insert(key.to_string(), value);
    }

    fn save(&mut self) -> Result<()> {
        let json = serde_json::to_string(&self.values)
            .map_err(|e| Error::transport(format!("cannot serialize session: {}", e)))?;
        self.signed = Some(sign_cookie(&json, &self.key)?);
        Ok(())
    }
}

/// 一次请求 / 响应对应的 Cookie 集合
///
/// 从请求的 `Cookie` 头构建，槽位保存后通过 [`CookieJar::set_cookie_headers`]
/// 取得需要写入响应的 `Set-Cookie` 头。
#[derive(Debug, Clone)]
pub struct CookieJar {
    key: CookieKey,
    options: CookieOptions,
    incoming: HashMap<String, String>,
    slots: BTreeMap<String, CookieSlot>,
}

impl CookieJar {
    /// 从请求的 `Cookie` 头创建
    pub fn from_request(cookie_header: Option<&str>, key: CookieKey) -> Self {
        Self {
            key,
            options: CookieOptions::default(),
            incoming: cookie_header.map(parse_cookie_header).unwrap_or_default(),
            slots: BTreeMap::new(),
        }
    }

    /// 设置写出 Cookie 时使用的属性
    pub fn with_options(mut self, options: CookieOptions) -> Self {
        self.options = options;
        self
    }

    /// 已保存槽位对应的 `Set-Cookie` 头，按 Cookie 名称排序
    pub fn set_cookie_headers(&self) -> Vec<String> {
        self.slots
            .values()
            .filter_map(|slot| {
                let signed = slot.signed.as_ref()?;
                Some(
                    SecureCookie::new(&slot.name, signed)
                        .with_options(self.options.clone())
                        .to_header_value(),
                )
            })
            .collect()
    }

    /// 浏览器在下一次请求中回传的 `Cookie` 头
    ///
    /// 合并请求中原有的 Cookie 和本次保存的新值。
    pub fn request_cookie_header(&self) -> Option<String> {
        let mut cookies: BTreeMap<&str, &str> = self
            .incoming
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
            .collect();
        for slot in self.slots.values() {
            if let Some(ref signed) = slot.signed {
                cookies.insert(&slot.name, signed);
            }
        }

        if cookies.is_empty() {
            return None;
        }

        Some(
            cookies
                .into_iter()
                .map(|(name, value)| format!("{}={}", name, value))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }
}

impl SessionTransport for CookieJar {
    fn slot(&mut self, name: &str) -> &mut dyn SessionSlot {
        let key = &self.key;
        let incoming = &self.incoming;
        self.slots
            .entry(name.to_string())
            .or_insert_with(|| CookieSlot::open(name, key, incoming.get(name).map(String::as_str)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::TOKEN_KEY;

    fn test_key() -> CookieKey {
        CookieKey::from_bytes(b"test-secret-key-at-least-32-bytes!!".to_vec())
    }

    #[test]
    fn test_sign_and_verify() {
        let value = "test_value_123";
        let signed = sign_cookie(value, &test_key()).unwrap();

        assert!(signed.contains(SIGNATURE_SEPARATOR));

        let verified = verify_cookie(&signed, &test_key()).unwrap();
        assert_eq!(verified, value);
    }

    #[test]
    fn test_verify_with_wrong_key() {
        let signed = sign_cookie("test_value", &test_key()).unwrap();

        let wrong_key = CookieKey::from_bytes(b"wrong-secret-key-at-least-32-bytes!!".to_vec());
        assert!(verify_cookie(&signed, &wrong_key).is_err());
    }

    #[test]
    fn test_verify_tampered_value() {
        let signed = sign_cookie("user123", &test_key()).unwrap();
        let (_, signature) = signed.rsplit_once('.').unwrap();
        let forged = format!("{}.{}", URL_SAFE_NO_PAD.encode("admin"), signature);

        assert!(verify_cookie(&forged, &test_key()).is_err());
        assert!(verify_cookie("no-separator", &test_key()).is_err());
    }

    #[test]
    fn test_generated_keys_differ() {
        let a = CookieKey::generate().unwrap();
        let b = CookieKey::generate().unwrap();

        assert_eq!(a.as_bytes().len(), GENERATED_KEY_LENGTH);
        assert_ne!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn test_parse_cookie_header() {
        let cookies = parse_cookie_header("a=1; b = two ;=bad; flag; c=x=y");

        assert_eq!(cookies["a"], "1");
        assert_eq!(cookies["b"], "two");
        assert_eq!(cookies["c"], "x=y");
        assert_eq!(cookies.len(), 3);
    }

    #[test]
    fn test_header_value() {
        let options = CookieOptions {
            secure: true,
            same_site: SameSite::Strict,
            domain: Some("example.com".into()),
            max_age: Some(Duration::from_secs(3600)),
            ..Default::default()
        };
        let header = SecureCookie::new("session", "abc123")
            .with_options(options)
            .to_header_value();

        assert_eq!(
            header,
            "session=abc123; HttpOnly; Secure; SameSite=Strict; Max-Age=3600; Path=/; Domain=example.com"
        );
    }

    #[test]
    fn test_jar_round_trip() {
        let mut jar = CookieJar::from_request(None, test_key());
        assert!(jar.slot("app").get(TOKEN_KEY).is_none());
        assert!(jar.set_cookie_headers().is_empty());

        let slot = jar.slot("app");
        slot.set(TOKEN_KEY, Value::from("jwt"));
        slot.save().unwrap();

        let headers = jar.set_cookie_headers();
        assert_eq!(headers.len(), 1);
        assert!(headers[0].starts_with("app="));

        let cookie = jar.request_cookie_header().unwrap();
        let mut next = CookieJar::from_request(Some(&cookie), test_key());
        assert_eq!(next.slot("app").get(TOKEN_KEY), Some(&Value::from("jwt")));
    }

    #[test]
    fn test_unsaved_slot_not_emitted() {
        let mut jar = CookieJar::from_request(None, test_key());
        jar.slot("app").set(TOKEN_KEY, Value::from("jwt"));

        assert!(jar.set_cookie_headers().is_empty());
        assert!(jar.request_cookie_header().is_none());
    }

    #[test]
    fn test_jar_discards_forged_cookie() {
        let forged = format!(
            "app={}.{}",
            URL_SAFE_NO_PAD.encode(r#"{"token":"forged"}"#),
            URL_SAFE_NO_PAD.encode("not-a-mac")
        );
        let mut jar = CookieJar::from_request(Some(&forged), test_key());

        assert!(jar.slot("app").get(TOKEN_KEY).is_none());
    }

    #[test]
    fn test_jar_keeps_unrelated_cookies() {
        let mut jar = CookieJar::from_request(Some("theme=dark"), test_key());
        let slot = jar.slot("app");
        slot.set(TOKEN_KEY, Value::from("jwt"));
        slot.save().unwrap();

        let cookie = jar.request_cookie_header().unwrap();
        assert!(cookie.starts_with("app="));
        assert!(cookie.ends_with("; theme=dark"));
    }
}
