//! 属性测试：签名篡改和往返

use std::collections::BTreeMap;

use authrs_session::{
    Error, JwtAlgorithm, KeyPair, SessionClaims, TokenCodec, TokenError,
};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use proptest::prelude::*;

const RSA_PRIVATE: &[u8] = include_bytes!("fixtures/rsa_private.pem");
const RSA_PUBLIC: &[u8] = include_bytes!("fixtures/rsa_public.pem");
const ED_PRIVATE: &[u8] = include_bytes!("fixtures/ed25519_private.pem");
const ED_PUBLIC: &[u8] = include_bytes!("fixtures/ed25519_public.pem");

fn codec(algorithm: JwtAlgorithm, private: &[u8], public: &[u8]) -> TokenCodec {
    TokenCodec::new(algorithm, KeyPair::from_pem(algorithm, private, public).unwrap())
}

/// 翻转签名解码后的一个原始字节，再重新编码
fn flip_signature_byte(token: &str, index: usize, mask: u8) -> String {
    let (message, signature) = token.rsplit_once('.').unwrap();
    let mut bytes = URL_SAFE_NO_PAD.decode(signature).unwrap();
    let i = index % bytes.len();
    bytes[i] ^= mask;
    format!("{}.{}", message, URL_SAFE_NO_PAD.encode(bytes))
}

/// 把签名文本中的一个字符替换为任意可打印字符（不含 `.`）
fn replace_signature_char(token: &str, index: usize, replacement: char) -> Option<String> {
    let start = token.rfind('.')? + 1;
    let position = start + index % (token.len() - start);
    let original = token[position..].chars().next()?;
    if original == replacement {
        return None;
    }

    let mut tampered = token.to_string();
    tampered.replace_range(position..position + 1, &replacement.to_string());
    Some(tampered)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_rsa_signature_tamper_rejected(index in 0usize..512, mask in 1u8..=255) {
        let codec = codec(JwtAlgorithm::RS256, RSA_PRIVATE, RSA_PUBLIC);
        let token = codec
            .encode(&SessionClaims::new(serde_json::json!({ "id": 1 }), 1_900_000_000))
            .unwrap();

        let tampered = flip_signature_byte(&token, index, mask);
        let result = codec.decode::<serde_json::Value>(&tampered);

        prop_assert!(
            matches!(result, Err(Error::Token(TokenError::InvalidSignature))),
            "got {:?}",
            result
        );
    }

    #[test]
    fn prop_ed25519_signature_tamper_rejected(index in 0usize..64, mask in 1u8..=255) {
        let codec = codec(JwtAlgorithm::EdDSA, ED_PRIVATE, ED_PUBLIC);
        let token = codec
            .encode(&SessionClaims::new(serde_json::json!({ "id": 1 }), 1_900_000_000))
            .unwrap();

        let tampered = flip_signature_byte(&token, index, mask);
        let result = codec.decode::<serde_json::Value>(&tampered);

        prop_assert!(
            matches!(result, Err(Error::Token(TokenError::InvalidSignature))),
            "got {:?}",
            result
        );
    }

    #[test]
    fn prop_user_data_round_trip(
        user in prop::collection::btree_map("[a-zA-Z_]{1,12}", "[ -~]{0,24}", 0..8),
        exp in 0i64..4_000_000_000,
    ) {
        let codec = codec(JwtAlgorithm::EdDSA, ED_PRIVATE, ED_PUBLIC);
        let claims = SessionClaims::new(user.clone(), exp);

        let token = codec.encode(&claims).unwrap();
        let decoded: SessionClaims<BTreeMap<String, String>> = codec.decode(&token).unwrap();

        prop_assert_eq!(decoded.user, user);
        prop_assert_eq!(decoded.exp, exp);
    }

    #[test]
    fn prop_signature_text_tamper_rejected(
        index in 0usize..512,
        replacement in prop::char::range(' ', '~').prop_filter("segment separator", |c| *c != '.'),
    ) {
        let codec = codec(JwtAlgorithm::RS256, RSA_PRIVATE, RSA_PUBLIC);
        let token = codec
            .encode(&SessionClaims::new(serde_json::json!({ "id": 1 }), 1_900_000_000))
            .unwrap();

        if let Some(tampered) = replace_signature_char(&token, index, replacement) {
            let result = codec.decode::<serde_json::Value>(&tampered);
            prop_assert!(
                matches!(result, Err(Error::Token(TokenError::InvalidSignature))),
                "got {:?}",
                result
            );
        }
    }
}
