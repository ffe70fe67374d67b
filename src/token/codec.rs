//! Token 编解码
//!
//! 纯密码学边界：负责签名和验签，不做任何过期检查。过期策略由
//! [`SessionManager`](crate::session::SessionManager) 负责。

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Serialize, de::DeserializeOwned};

use crate::config::{JwtAlgorithm, KeyPair};
use crate::error::{Error, Result, TokenError};
use crate::token::SessionClaims;

/// 使用私钥签名 Claims
///
/// `claims` 必须已经包含 `exp`。密钥类型与算法不匹配或签名原语失败时返回
/// [`TokenError::SigningFailed`]。
pub fn encode_claims<T: Serialize>(
    claims: &SessionClaims<T>,
    key: &EncodingKey,
    algorithm: JwtAlgorithm,
) -> Result<String> {
    let header = Header::new(algorithm.into());

    encode(&header, claims, key).map_err(|e| {
        Error::Token(TokenError::SigningFailed(format!(
            "failed to sign {} token: {}",
            algorithm, e
        )))
    })
}

/// 验证签名并解码 Claims
///
/// 只接受配置的算法。结构错误返回 [`TokenError::Malformed`]，签名不匹配
/// （包括头部声明了其他算法）返回 [`TokenError::InvalidSignature`]。
/// 返回的 Claims 原样包含 `exp`，不检查是否过期。
///
/// 头部和负载在验签前单独检查 base64url，所以验签阶段的 base64 错误只可能
/// 来自签名段，按签名无效处理。
pub fn decode_claims<T: DeserializeOwned>(
    token: &str,
    key: &DecodingKey,
    algorithm: JwtAlgorithm,
) -> Result<SessionClaims<T>> {
    check_structure(token)?;
    let validation = build_validation(algorithm);

    decode::<SessionClaims<T>>(token, key, &validation)
        .map(|data| data.claims)
        .map_err(|e| {
            let error = match e.kind() {
                ErrorKind::InvalidSignature
                | ErrorKind::InvalidAlgorithm
                | ErrorKind::Base64(_) => TokenError::InvalidSignature,
                ErrorKind::InvalidToken => {
                    TokenError::Malformed("invalid token structure".to_string())
                }
                _ => TokenError::Malformed(e.to_string()),
            };
            Error::Token(error)
        })
}

/// 三段结构，头部和负载必须是合法的 base64url
fn check_structure(token: &str) -> Result<()> {
    let segments: Vec<&str> = token.split('.').collect();
    let [header, payload, _signature] = segments.as_slice() else {
        return Err(Error::Token(TokenError::Malformed(format!(
            "expected 3 segments, got {}",
            segments.len()
        ))));
    };

    for (name, segment) in [("header", header), ("payload", payload)] {
        URL_SAFE_NO_PAD.decode(segment).map_err(|e| {
            Error::Token(TokenError::Malformed(format!("invalid {} encoding: {}", name, e)))
        })?;
    }
    Ok(())
}

fn build_validation(algorithm: JwtAlgorithm) -> Validation {
    let mut validation = Validation::new(algorithm.into());
    validation.validate_exp = false;
    validation.validate_nbf = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();
    validation
}

/// 绑定算法和密钥对的编解码器
#[derive(Debug, Clone)]
pub struct TokenCodec {
    algorithm: JwtAlgorithm,
    keys: KeyPair,
}

impl TokenCodec {
    /// 创建编解码器
    pub fn new(algorithm: JwtAlgorithm, keys: KeyPair) -> Self {
        Self { algorithm, keys }
    }

    /// 签名算法
    pub fn algorithm(&self) -> JwtAlgorithm {
        self.algorithm
    }

    /// 使用私钥签名
    pub fn encode<T: Serialize>(&self, claims: &SessionClaims<T>) -> Result<String> {
        encode_claims(claims, self.keys.encoding_key(), self.algorithm)
    }

    /// 使用公钥验证并解码
    pub fn decode<T: DeserializeOwned>(&self, token: &str) -> Result<SessionClaims<T>> {
        decode_claims(token, self.keys.decoding_key(), self.algorithm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    const RSA_PRIVATE: &[u8] = include_bytes!("../../tests/fixtures/rsa_private.pem");
    const RSA_PUBLIC: &[u8] = include_bytes!("../../tests/fixtures/rsa_public.pem");
    const OTHER_RSA_PUBLIC: &[u8] = include_bytes!("../../tests/fixtures/other_rsa_public.pem");
    const EC_PRIVATE: &[u8] = include_bytes!("../../tests/fixtures/ec_private.pem");

    fn rsa_codec() -> TokenCodec {
        let keys = KeyPair::from_pem(JwtAlgorithm::RS256, RSA_PRIVATE, RSA_PUBLIC).unwrap();
        TokenCodec::new(JwtAlgorithm::RS256, keys)
    }

    #[test]
    fn test_encode_decode() {
        let codec = rsa_codec();
        let claims = SessionClaims::new(json!({ "testValue": "test" }), 1_700_000_000);

        let token = codec.encode(&claims).unwrap();
        assert_eq!(token.matches('.').count(), 2); // JWT 有两个点

        let decoded: SessionClaims<Value> = codec.decode(&token).unwrap();
        assert_eq!(decoded, claims);
    }

    #[test]
    fn test_decode_does_not_check_expiry() {
        let codec = rsa_codec();
        let claims = SessionClaims::new(json!({}), 1); // 1970 年就过期了

        let token = codec.encode(&claims).unwrap();
        let decoded: SessionClaims<Value> = codec.decode(&token).unwrap();
        assert_eq!(decoded.exp, 1);
    }

    #[test]
    fn test_wrong_public_key() {
        let token = rsa_codec()
            .encode(&SessionClaims::new(json!({}), 1_700_000_000))
            .unwrap();

        let other = DecodingKey::from_rsa_pem(OTHER_RSA_PUBLIC).unwrap();
        let result = decode_claims::<Value>(&token, &other, JwtAlgorithm::RS256);

        assert!(matches!(
            result,
            Err(Error::Token(TokenError::InvalidSignature))
        ));
    }

    #[test]
    fn test_malformed_tokens() {
        let codec = rsa_codec();

        for token in ["", "not-a-token", "a.b", "a.b.c", "....."] {
            let result = codec.decode::<Value>(token);
            assert!(
                matches!(result, Err(Error::Token(TokenError::Malformed(_)))),
                "token {token:?} gave {result:?}"
            );
        }
    }

    #[test]
    fn test_signature_text_tampering() {
        let codec = rsa_codec();
        let token = codec
            .encode(&SessionClaims::new(json!({ "id": 1 }), 1_700_000_000))
            .unwrap();
        let start = token.rfind('.').unwrap() + 1;

        // 每个签名字符都翻转最低位，包括最后一个字符
        for index in start..token.len() {
            let mut bytes = token.clone().into_bytes();
            bytes[index] ^= 0x01;
            let tampered = String::from_utf8(bytes).unwrap();

            let result = codec.decode::<Value>(&tampered);
            assert!(
                matches!(result, Err(Error::Token(TokenError::InvalidSignature))),
                "index {index} gave {result:?}"
            );
        }
    }

    #[test]
    fn test_bad_header_encoding_is_malformed() {
        let codec = rsa_codec();
        let token = codec
            .encode(&SessionClaims::new(json!({}), 1_700_000_000))
            .unwrap();
        let tampered = format!("!{}", &token[1..]);

        let result = codec.decode::<Value>(&tampered);
        assert!(matches!(
            result,
            Err(Error::Token(TokenError::Malformed(_)))
        ));
    }

    #[test]
    fn test_payload_without_exp_is_malformed() {
        let token = encode(
            &Header::new(jsonwebtoken::Algorithm::RS256),
            &json!({ "user": { "a": 1 } }),
            &EncodingKey::from_rsa_pem(RSA_PRIVATE).unwrap(),
        )
        .unwrap();

        let result = rsa_codec().decode::<Value>(&token);
        assert!(matches!(
            result,
            Err(Error::Token(TokenError::Malformed(_)))
        ));
    }

    #[test]
    fn test_other_algorithm_in_header_rejected() {
        let keys = KeyPair::from_pem(JwtAlgorithm::RS512, RSA_PRIVATE, RSA_PUBLIC).unwrap();
        let token = TokenCodec::new(JwtAlgorithm::RS512, keys)
            .encode(&SessionClaims::new(json!({}), 1_700_000_000))
            .unwrap();

        let result = rsa_codec().decode::<Value>(&token);
        assert!(matches!(
            result,
            Err(Error::Token(TokenError::InvalidSignature))
        ));
    }

    #[test]
    fn test_signing_with_wrong_key_family() {
        let ec_key = EncodingKey::from_ec_pem(EC_PRIVATE).unwrap();
        let result = encode_claims(
            &SessionClaims::new(json!({}), 1_700_000_000),
            &ec_key,
            JwtAlgorithm::RS256,
        );

        assert!(matches!(
            result,
            Err(Error::Token(TokenError::SigningFailed(_)))
        ));
    }
}
