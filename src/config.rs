use std::{env, str::FromStr};

#[derive(Debug, Clone)]
pub struct Settings {
    pub mongodb_uri: String,
    pub mongodb_db: String,
    pub host: String,
    pub port: u16,

    pub jwt_secret: String,
    pub jwt_cookie_name: String,
    pub cookie_secure: bool,

    // advertisement source polled by the watch timers
    pub advert_api_url: String,
    pub advert_api_key: String,

    pub notify_webhook_url: Option<String>,

    // concurrent save+send chains per user, 0 = unbounded
    pub max_deliveries: usize,
}

fn text(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|s| !s.trim().is_empty())
}

fn parsed<T: FromStr>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(var = name, value = %raw, "unparsable setting, using default");
            default
        }),
        Err(_) => default,
    }
}

fn flag(name: &str) -> bool {
    env::var(name)
        .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}

pub fn load() -> Settings {
    // .env is optional
    dotenvy::dotenv().ok();

    Settings {
        mongodb_uri: text("MONGODB_URI", "mongodb://localhost:27017"),
        mongodb_db: text("MONGODB_DB", "adwatch"),
        host: text("HOST", "127.0.0.1"),
        port: parsed("PORT", 3000),

        jwt_secret: text("JWT_SECRET", "change-me-dev-secret"),
        jwt_cookie_name: text("JWT_COOKIE_NAME", "auth"),
        cookie_secure: flag("COOKIE_SECURE"),

        advert_api_url: text("ADVERT_API_URL", ""),
        advert_api_key: text("ADVERT_API_KEY", ""),

        notify_webhook_url: optional("NOTIFY_WEBHOOK_URL"),
        max_deliveries: parsed("WATCH_MAX_DELIVERIES", 64),
    }
}
