use actix_web::{HttpResponse, get, post, web};
use base64::{Engine as _, engine::general_purpose};
use log::debug;
use serde::Serialize;

use crate::AppState;
use crate::dtos::post::{CreatePostIn, PostOut};
use crate::middleware::auth_extractor::AuthenticatedUser;
use crate::repositories::post_store::{ImageUpload, StoreError};

#[derive(Serialize)]
struct ApiResponse<T: Serialize> {
    status: String,
    message: String,
    data: Option<T>,
}

fn bad_request(message: &str) -> HttpResponse {
    HttpResponse::BadRequest().json(ApiResponse::<()> {
        status: "error".to_string(),
        message: message.to_string(),
        data: None,
    })
}

fn store_error_response(err: &StoreError) -> HttpResponse {
    let body = ApiResponse::<()> {
        status: "error".to_string(),
        message: err.to_string(),
        data: None,
    };
    match err {
        StoreError::Validation(_) => HttpResponse::BadRequest().json(body),
        StoreError::NotFound => HttpResponse::NotFound().json(body),
        StoreError::Unavailable(_) => HttpResponse::BadGateway().json(body),
    }
}

/// POST /api/posts - compose a post: description plus a captured image. The
/// image type is checked here, before anything reaches the store.
#[post("/posts")]
pub async fn create_post(
    app_state: web::Data<AppState>,
    user: AuthenticatedUser,
    body: web::Json<CreatePostIn>,
) -> HttpResponse {
    let mime_type: mime::Mime = match body.content_type.parse() {
        Ok(m) => m,
        Err(_) => return bad_request("Invalid content type"),
    };
    if mime_type.type_() != mime::IMAGE {
        return bad_request("Only image uploads are accepted");
    }

    // strip a data URL prefix if the client sent one (data:image/png;base64,)
    let base64_data = if body.image_data.contains(',') {
        body.image_data.split(',').nth(1).unwrap_or(&body.image_data)
    } else {
        &body.image_data
    };

    let image_bytes = match general_purpose::STANDARD.decode(base64_data) {
        Ok(bytes) => bytes,
        Err(_) => return bad_request("Invalid base64 image data"),
    };
    debug!(
        "creating post for {}: {} image bytes",
        user.user_id,
        image_bytes.len()
    );

    let image = ImageUpload {
        bytes: image_bytes,
        content_type: mime_type.essence_str().to_string(),
    };
    match app_state
        .store
        .create_post(user.user_id, &body.description, image)
        .await
    {
        Ok(created) => HttpResponse::Ok().json(ApiResponse {
            status: "success".to_string(),
            message: "Post created successfully".to_string(),
            data: Some(PostOut::from(created)),
        }),
        Err(e) => store_error_response(&e),
    }
}

/// GET /test/store - connectivity probe against the configured store.
#[get("/test/store")]
pub async fn store_probe(app_state: web::Data<AppState>) -> HttpResponse {
    match app_state.store.fetch_recent_posts(1, false).await {
        Ok(posts) => HttpResponse::Ok().json(ApiResponse {
            status: "success".to_string(),
            message: "Store reachable".to_string(),
            data: Some(serde_json::json!({ "posts_seen": posts.len() })),
        }),
        Err(e) => store_error_response(&e),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::{App, test, web};
    use serde_json::Value;

    use super::*;
    use crate::middleware::auth_extractor::bearer_token_for;
    use crate::repositories::post_memory_repo::PostMemoryRepo;
    use crate::repositories::post_store::PostStore;
    use crate::services::feed_session::FeedSession;

    fn fresh_state() -> (web::Data<AppState>, Arc<PostMemoryRepo>) {
        let repo = Arc::new(PostMemoryRepo::new());
        let store: Arc<dyn PostStore> = repo.clone();
        let session = Arc::new(FeedSession::new(store.clone(), 20));
        (web::Data::new(AppState { store, session }), repo)
    }

    #[actix_web::test]
    async fn creates_a_post_from_a_base64_image() {
        let (state, repo) = fresh_state();
        let author = repo.register_user("ada");
        let app = test::init_service(
            App::new()
                .app_data(state)
                .service(web::scope("/api").service(create_post)),
        )
        .await;

        let image = general_purpose::STANDARD.encode([0x89, 0x50, 0x4e, 0x47]);
        let req = test::TestRequest::post()
            .uri("/api/posts")
            .insert_header(("Authorization", bearer_token_for(author.id)))
            .set_json(serde_json::json!({
                "description": "first light",
                "image_data": format!("data:image/png;base64,{}", image),
                "content_type": "image/png",
            }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["status"], "success");
        assert_eq!(body["data"]["description"], "first light");
        assert_eq!(body["data"]["author"], "ada");
        assert_eq!(body["data"]["comment_count"], 0);

        let posts = repo.fetch_recent_posts(20, true).await.unwrap();
        assert_eq!(posts.len(), 1);
    }

    #[actix_web::test]
    async fn non_image_content_type_is_rejected_locally() {
        let (state, repo) = fresh_state();
        let author = repo.register_user("ada");
        let app = test::init_service(
            App::new()
                .app_data(state)
                .service(web::scope("/api").service(create_post)),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/posts")
            .insert_header(("Authorization", bearer_token_for(author.id)))
            .set_json(serde_json::json!({
                "description": "nope",
                "image_data": "aGVsbG8=",
                "content_type": "text/plain",
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), actix_web::http::StatusCode::BAD_REQUEST);
        assert!(repo.fetch_recent_posts(20, false).await.unwrap().is_empty());
    }

    #[actix_web::test]
    async fn store_probe_reports_reachability() {
        let (state, _) = fresh_state();
        let app = test::init_service(App::new().app_data(state).service(store_probe)).await;

        let req = test::TestRequest::get().uri("/test/store").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["status"], "success");
        assert_eq!(body["data"]["posts_seen"], 0);
    }
}
