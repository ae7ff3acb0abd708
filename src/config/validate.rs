use anyhow::{Result, bail};

use super::{AppConfig, defaults::MIN_ADMIN_PASSWORD_LEN};

pub fn validate(cfg: &AppConfig) -> Result<()> {
    let mut errors: Vec<String> = Vec::new();

    if cfg.general.host.trim().is_empty() {
        errors.push("general.host must not be empty".to_string());
    }

    if let Some(database) = cfg.database.as_ref() {
        if database.url.trim().is_empty() {
            errors.push("database.url must not be empty".to_string());
        }

        if database.min_idle > database.max_connections {
            errors.push(format!(
                "database.min_idle ({}) must be <= database.max_connections ({})",
                database.min_idle, database.max_connections
            ));
        }
    }

    let auth = &cfg.auth;
    if auth.access_token_secret.trim().is_empty() {
        errors.push("auth.access_token_secret must not be empty".to_string());
    }

    if auth.refresh_token_secret.trim().is_empty() {
        errors.push("auth.refresh_token_secret must not be empty".to_string());
    }

    if !auth.access_token_secret.is_empty() && auth.access_token_secret == auth.refresh_token_secret
    {
        errors.push("auth.access_token_secret and auth.refresh_token_secret must differ".to_string());
    }

    if auth.access_token_ttl_secs <= 0 {
        errors.push("auth.access_token_ttl_secs must be > 0".to_string());
    }

    if auth.refresh_token_ttl_secs <= auth.access_token_ttl_secs {
        errors.push(format!(
            "auth.refresh_token_ttl_secs ({}) must be greater than auth.access_token_ttl_secs ({})",
            auth.refresh_token_ttl_secs, auth.access_token_ttl_secs
        ));
    }

    if auth.admin_username.trim().is_empty() {
        errors.push("auth.admin_username must not be empty".to_string());
    }

    if auth
        .admin_password
        .as_ref()
        .is_some_and(|password| password.len() < MIN_ADMIN_PASSWORD_LEN)
    {
        errors.push(format!(
            "auth.admin_password must be at least {MIN_ADMIN_PASSWORD_LEN} characters"
        ));
    }

    if errors.is_empty() {
        return Ok(());
    }

    bail!("invalid app config:\n- {}", errors.join("\n- "))
}
