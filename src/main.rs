mod config;
mod dtos;
mod handlers;
mod middleware;
mod models;
mod repositories;
mod services;

use std::sync::Arc;
use std::time::Duration;

use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware::Logger, web};
use log::{error, info};
use reqwest::Client;

use crate::config::StoreBackend;
use crate::handlers::feed_handlers::{
    get_draft, get_feed, get_section_row, list_section_rows, refresh_feed, submit_comment,
};
use crate::handlers::post_handlers::{create_post, store_probe};
use crate::repositories::post_memory_repo::PostMemoryRepo;
use crate::repositories::post_store::PostStore;
use crate::repositories::post_supabase_repo::PostSupabaseRepo;
use crate::services::feed_session::FeedSession;

fn mask_key(k: &str) -> String {
    if k.len() <= 8 {
        "[REDACTED]".to_string()
    } else {
        format!("{}***{}", &k[..4], &k[k.len() - 4..])
    }
}

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn PostStore>,
    pub session: Arc<FeedSession>,
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init();
    dotenv::dotenv().ok();

    let cfg = match config::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to load config: {}", e);
            std::process::exit(1);
        }
    };

    let store: Arc<dyn PostStore> = match cfg.store_backend {
        StoreBackend::Supabase => {
            info!("Supabase URL: {}", cfg.supabase_url);
            info!("Supabase Key: {}", mask_key(&cfg.service_role_key));

            let http_client = Client::builder()
                .user_agent("photofeed-be/0.1")
                .timeout(Duration::from_secs(cfg.store_timeout_secs))
                .build()
                .expect("failed to build http client");

            Arc::new(PostSupabaseRepo::new(
                &cfg.supabase_url,
                cfg.service_role_key.clone(),
                cfg.anon_key.clone(),
                http_client,
            ))
        }
        StoreBackend::Memory => {
            info!("Using the in-memory post store");
            let repo = PostMemoryRepo::new();
            // the memory store starts empty; give manual testing a known author
            let demo = repo.register_user("demo");
            info!("Registered demo user {}", demo.id);
            Arc::new(repo)
        }
    };

    let session = Arc::new(FeedSession::new(store.clone(), cfg.page_size));
    let state = web::Data::new(AppState {
        store,
        session: session.clone(),
    });

    let bind_address = format!("0.0.0.0:{}", cfg.port);
    info!("Starting server on {}", bind_address);

    let allowed_origins = cfg.allowed_origins.clone();
    let result = HttpServer::new(move || {
        let mut cors = Cors::default()
            .allowed_methods(vec!["GET", "POST", "OPTIONS"])
            .allowed_headers(vec![
                "authorization",
                "content-type",
                "accept",
                "x-requested-with",
            ])
            .supports_credentials()
            .max_age(3600);

        for origin in allowed_origins
            .split(',')
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
        {
            cors = cors.allowed_origin(origin);
        }

        App::new()
            .wrap(cors)
            .wrap(Logger::default())
            .app_data(state.clone())
            .service(
                web::scope("/api")
                    .service(get_feed)          // GET  /api/feed
                    .service(refresh_feed)      // POST /api/feed/refresh
                    .service(get_draft)         // GET  /api/feed/draft
                    .service(list_section_rows) // GET  /api/feed/{section}/rows
                    .service(get_section_row)   // GET  /api/feed/{section}/rows/{row}
                    .service(submit_comment)    // POST /api/feed/{section}/comments
                    .service(create_post),      // POST /api/posts
            )
            .service(store_probe) // GET /test/store
    })
    .bind(&bind_address)?
    .run()
    .await;

    // page teardown: anything still in flight is discarded
    session.close();
    result
}
