use std::env;

use anyhow::{Context, Result};

/// Runtime settings, resolved from the environment once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub store_backend: StoreBackend,
    pub supabase_url: String,
    pub service_role_key: String,
    pub anon_key: Option<String>,
    /// Posts per feed fetch. The page is fixed; going past it takes a
    /// follow-up fetch.
    pub page_size: u32,
    /// Deadline for every store call. A hung backend surfaces as a store
    /// failure instead of blocking the session forever.
    pub store_timeout_secs: u64,
    pub port: u16,
    pub allowed_origins: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Supabase,
    Memory,
}

pub fn from_env() -> Result<AppConfig> {
    let store_backend = match env::var("STORE_BACKEND")
        .unwrap_or_else(|_| "supabase".to_string())
        .to_lowercase()
        .as_str()
    {
        "memory" => StoreBackend::Memory,
        _ => StoreBackend::Supabase,
    };

    // backend credentials are only required when that backend is selected
    let (supabase_url, service_role_key) = if store_backend == StoreBackend::Supabase {
        (
            env::var("SUPABASE_URL").context("SUPABASE_URL not set")?,
            env::var("SUPABASE_SERVICE_ROLE_KEY").context("SUPABASE_SERVICE_ROLE_KEY not set")?,
        )
    } else {
        (String::new(), String::new())
    };

    let page_size = env::var("FEED_PAGE_SIZE")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(20);
    let store_timeout_secs = env::var("STORE_TIMEOUT_SECS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(10);
    let port = env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(8080);
    let allowed_origins = env::var("ALLOWED_ORIGINS")
        .unwrap_or_else(|_| "http://localhost:3000,http://127.0.0.1:3000".to_string());

    Ok(AppConfig {
        store_backend,
        supabase_url,
        service_role_key,
        anon_key: env::var("SUPABASE_ANON_KEY").ok(),
        page_size,
        store_timeout_secs,
        port,
        allowed_origins,
    })
}
