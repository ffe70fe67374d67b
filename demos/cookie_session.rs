//! Cookie 会话示例
//!
//! 模拟浏览器与服务端之间的几次请求，展示签发、滑动刷新和过期。
//!
//! 运行: RUST_LOG=authrs_session=debug cargo run --example cookie_session

use std::sync::Arc;

use authrs_session::transport::{CookieJar, CookieKey};
use authrs_session::{Error, ManualClock, SessionClaims, SessionManager, SessionSettings};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

const FIXTURES: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures");

#[derive(Debug, Serialize, Deserialize)]
struct UserInfo {
    user_id: String,
    username: String,
    roles: Vec<String>,
}

/// 处理一次请求，返回响应中的 Set-Cookie 头
fn handle_request(
    manager: &SessionManager<Arc<ManualClock>>,
    key: &CookieKey,
    cookie_header: Option<&str>,
) -> CookieJar {
    let mut jar = CookieJar::from_request(cookie_header, key.clone());

    match manager.resolve_in::<UserInfo>(&mut jar) {
        Ok(SessionClaims { user, exp }) => {
            println!("✅ 200 {} (roles: {:?}), exp = {}", user.username, user.roles, exp);
        }
        Err(Error::SessionExpired(expired)) => {
            let name = expired
                .user_as::<UserInfo>()
                .map(|u| u.username)
                .unwrap_or_default();
            println!("⏰ 401 会话已过期，请 {} 重新登录", name);
        }
        Err(e) if e.is_unauthenticated() => println!("🚫 401 {}", e),
        Err(e) => println!("❌ 500 {}", e),
    }

    for header in jar.set_cookie_headers() {
        println!("   Set-Cookie: {}…", &header[..header.len().min(60)]);
    }
    jar
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let settings = SessionSettings::new(
        format!("{FIXTURES}/rsa_private.pem"),
        format!("{FIXTURES}/rsa_public.pem"),
    )
    .with_session_name("demo_session")
    .with_session_timeout(Duration::seconds(5))
    .with_refresh_interval(Duration::seconds(2));

    let clock = Arc::new(ManualClock::starting_now());
    let manager = SessionManager::load(settings)?.with_clock(Arc::clone(&clock));
    let key = CookieKey::generate()?;

    println!("=== 登录 ===");
    let user = UserInfo {
        user_id: "user_001".to_string(),
        username: "alice".to_string(),
        roles: vec!["user".to_string(), "editor".to_string()],
    };
    let mut jar = CookieJar::from_request(None, key.clone());
    manager.issue_in(&user, &mut jar)?;
    let mut cookie = jar.request_cookie_header();

    for (elapsed, label) in [(1, "1 秒后"), (2, "3 秒后（进入刷新窗口）"), (3, "6 秒后")] {
        clock.advance(Duration::seconds(elapsed));
        println!("\n=== {} ===", label);
        let jar = handle_request(&manager, &key, cookie.as_deref());
        cookie = jar.request_cookie_header();
    }

    println!("\n=== 停止访问 10 秒后 ===");
    clock.advance(Duration::seconds(10));
    handle_request(&manager, &key, cookie.as_deref());

    println!("\n=== 没有 Cookie ===");
    handle_request(&manager, &key, None);

    Ok(())
}
