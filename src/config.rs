use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub access_secret: String,
    pub refresh_secret: String,
    pub issuer: String,
    pub audience: String,
    pub access_ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub reset_ttl_minutes: i64,
    pub public_origin: Option<String>,
    pub port: u16,
}

fn env_i64(key: &str, default: i64) -> i64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<i64>().ok())
        .unwrap_or(default)
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let jwt = JwtConfig {
            access_secret: std::env::var("JWT_ACCESS_SECRET")?,
            refresh_secret: std::env::var("JWT_REFRESH_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "pollwise".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "pollwise-users".into()),
            access_ttl_minutes: env_i64("JWT_ACCESS_TTL_MINUTES", 15),
            refresh_ttl_minutes: env_i64("JWT_REFRESH_TTL_MINUTES", 60 * 24 * 7),
        };
        if jwt.access_secret == jwt.refresh_secret {
            anyhow::bail!("JWT_ACCESS_SECRET and JWT_REFRESH_SECRET must differ");
        }
        Ok(Self {
            database_url,
            jwt,
            reset_ttl_minutes: env_i64("RESET_TTL_MINUTES", 15),
            public_origin: std::env::var("PUBLIC_ORIGIN").ok(),
            port: std::env::var("APP_PORT")
                .ok()
                .and_then(|v| v.parse::<u16>().ok())
                .unwrap_or(8080),
        })
    }

    /// Password-reset link for the frontend reset page. Without a configured
    /// origin we fall back to localhost rather than pointing the link at the
    /// backend itself.
    pub fn reset_link(&self, raw_token: &str) -> String {
        let origin = self
            .public_origin
            .clone()
            .unwrap_or_else(|| format!("http://localhost:{}", self.port));
        format!("{}/reset-password?token={}", origin, raw_token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_config(origin: Option<&str>) -> AppConfig {
        AppConfig {
            database_url: "postgres://localhost/test".into(),
            jwt: JwtConfig {
                access_secret: "a".into(),
                refresh_secret: "r".into(),
                issuer: "test".into(),
                audience: "test".into(),
                access_ttl_minutes: 15,
                refresh_ttl_minutes: 60,
            },
            reset_ttl_minutes: 15,
            public_origin: origin.map(Into::into),
            port: 8080,
        }
    }

    #[test]
    fn reset_link_uses_public_origin() {
        let config = make_config(Some("https://app.example.com"));
        assert_eq!(
            config.reset_link("tok123"),
            "https://app.example.com/reset-password?token=tok123"
        );
    }

    #[test]
    fn reset_link_falls_back_to_localhost() {
        let config = make_config(None);
        assert_eq!(
            config.reset_link("tok123"),
            "http://localhost:8080/reset-password?token=tok123"
        );
    }
}
