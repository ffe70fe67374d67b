//! Token 模块
//!
//! 会话 token 的 Claims 定义和签名 / 验签编解码。
//!
//! ## 示例
//!
//! ```rust,no_run
//! use authrs_session::config::{JwtAlgorithm, KeyPair};
//! use authrs_session::token::{SessionClaims, TokenCodec};
//! use serde_json::{Value, json};
//!
//! let keys = KeyPair::from_pem(
//!     JwtAlgorithm::RS256,
//!     &std::fs::read("keys/private.pem").unwrap(),
//!     &std::fs::read("keys/public.pem").unwrap(),
//! )
//! .unwrap();
//! let codec = TokenCodec::new(JwtAlgorithm::RS256, keys);
//!
//! let token = codec
//!     .encode(&SessionClaims::new(json!({ "role": "admin" }), 1_900_000_000))
//!     .unwrap();
//! let claims: SessionClaims<Value> = codec.decode(&token).unwrap();
//! assert_eq!(claims.user["role"], "admin");
//! ```

pub mod claims;
pub mod codec;

pub use claims::SessionClaims;
pub use codec::{TokenCodec, decode_claims, encode_claims};
