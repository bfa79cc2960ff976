use actix_web::{HttpResponse, get, post, web};
use serde::Serialize;

use crate::AppState;
use crate::dtos::feed::{FeedOut, FeedSectionOut, RefreshOut, SubmitCommentIn, SubmitCommentOut};
use crate::middleware::auth_extractor::AuthenticatedUser;
use crate::repositories::post_store::StoreError;
use crate::services::comment_submission::SubmissionError;
use crate::services::feed_session::FeedError;

#[derive(Serialize)]
struct ApiResponse<T: Serialize> {
    status: String,
    message: String,
    data: Option<T>,
}

fn ok<T: Serialize>(message: &str, data: T) -> HttpResponse {
    HttpResponse::Ok().json(ApiResponse {
        status: "success".to_string(),
        message: message.to_string(),
        data: Some(data),
    })
}

fn feed_error_response(err: &FeedError) -> HttpResponse {
    let body = ApiResponse::<()> {
        status: "error".to_string(),
        message: err.to_string(),
        data: None,
    };
    match err {
        FeedError::Store(StoreError::Validation(_)) => HttpResponse::BadRequest().json(body),
        FeedError::Store(StoreError::NotFound) | FeedError::SectionOutOfRange(_) => {
            HttpResponse::NotFound().json(body)
        }
        FeedError::Store(StoreError::Unavailable(_)) => HttpResponse::BadGateway().json(body),
        FeedError::Submission(SubmissionError::InFlight) => HttpResponse::Conflict().json(body),
        FeedError::Closed => HttpResponse::Gone().json(body),
    }
}

/// GET /api/feed - current page flattened into sections. Loads the first
/// page on first access.
#[get("/feed")]
pub async fn get_feed(app_state: web::Data<AppState>) -> HttpResponse {
    let session = &app_state.session;
    if let Err(e) = session.ensure_loaded().await {
        return feed_error_response(&e);
    }

    let sections: Vec<FeedSectionOut> = session
        .snapshot()
        .await
        .into_iter()
        .enumerate()
        .map(|(section, rows)| FeedSectionOut {
            section,
            row_count: rows.len(),
            rows,
        })
        .collect();

    ok(
        "Feed retrieved",
        FeedOut {
            section_count: sections.len(),
            sections,
        },
    )
}

/// POST /api/feed/refresh - pull-to-refresh. A refresh racing another one
/// joins it instead of hitting the store twice; the response says which
/// happened. On failure the client keeps rendering its previous page.
#[post("/feed/refresh")]
pub async fn refresh_feed(app_state: web::Data<AppState>) -> HttpResponse {
    match app_state.session.refresh().await {
        Ok(outcome) => {
            let section_count = app_state.session.section_count().await;
            ok("Feed refreshed", RefreshOut::new(outcome, section_count))
        }
        Err(e) => feed_error_response(&e),
    }
}

/// GET /api/feed/draft - draft preserved by the last failed submission.
#[get("/feed/draft")]
pub async fn get_draft(app_state: web::Data<AppState>) -> HttpResponse {
    ok("Draft retrieved", app_state.session.draft())
}

/// GET /api/feed/{section}/rows
#[get("/feed/{section}/rows")]
pub async fn list_section_rows(
    app_state: web::Data<AppState>,
    path: web::Path<usize>,
) -> HttpResponse {
    let section = path.into_inner();
    match app_state.session.rows(section).await {
        Some(rows) => ok(
            "Rows retrieved",
            FeedSectionOut {
                section,
                row_count: rows.len(),
                rows,
            },
        ),
        None => feed_error_response(&FeedError::SectionOutOfRange(section)),
    }
}

/// GET /api/feed/{section}/rows/{row}
#[get("/feed/{section}/rows/{row}")]
pub async fn get_section_row(
    app_state: web::Data<AppState>,
    path: web::Path<(usize, usize)>,
) -> HttpResponse {
    let (section, row) = path.into_inner();
    match app_state.session.row(section, row).await {
        Some(feed_row) => ok("Row retrieved", feed_row),
        None => HttpResponse::NotFound().json(ApiResponse::<()> {
            status: "error".to_string(),
            message: format!("no row {} in section {}", row, section),
            data: None,
        }),
    }
}

/// POST /api/feed/{section}/comments - add a comment to the post shown in
/// that section.
#[post("/feed/{section}/comments")]
pub async fn submit_comment(
    app_state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<usize>,
    body: web::Json<SubmitCommentIn>,
) -> HttpResponse {
    let section = path.into_inner();
    match app_state
        .session
        .submit_comment(section, user.user_id, &body.text)
        .await
    {
        Ok(comment) => {
            let row_count = app_state.session.row_count(section).await.unwrap_or(0);
            ok("Comment added", SubmitCommentOut { comment, row_count })
        }
        Err(e) => feed_error_response(&e),
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
    use crate::repositories::post_store::{ImageUpload, PostStore};
    use crate::services::feed_session::FeedSession;

    async fn seeded_state() -> (web::Data<AppState>, uuid::Uuid) {
        let repo = Arc::new(PostMemoryRepo::new());
        let author = repo.register_user("ada");
        let post = repo
            .create_post(
                author.id,
                "first light",
                ImageUpload {
                    bytes: vec![1, 2, 3],
                    content_type: "image/png".to_string(),
                },
            )
            .await
            .unwrap();
        repo.append_comment(post.id, author.id, "so warm").await.unwrap();

        let store: Arc<dyn PostStore> = repo;
        let session = Arc::new(FeedSession::new(store.clone(), 20));
        (web::Data::new(AppState { store, session }), author.id)
    }

    #[actix_web::test]
    async fn feed_endpoint_returns_sections_with_rows() {
        let (state, _) = seeded_state().await;
        let app = test::init_service(
            App::new()
                .app_data(state)
                .service(web::scope("/api").service(get_feed)),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/feed").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["status"], "success");
        assert_eq!(body["data"]["section_count"], 1);
        let rows = body["data"]["sections"][0]["rows"].as_array().unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0]["kind"], "post_header");
        assert_eq!(rows[1]["kind"], "comment");
        assert_eq!(rows[2]["kind"], "add_comment");
    }

    #[actix_web::test]
    async fn comment_submission_adds_a_row() {
        let (state, author_id) = seeded_state().await;
        let app = test::init_service(
            App::new()
                .app_data(state)
                .service(web::scope("/api").service(get_feed).service(submit_comment)),
        )
        .await;

        // load the page first
        let req = test::TestRequest::get().uri("/api/feed").to_request();
        let _: Value = test::call_and_read_body_json(&app, req).await;

        let req = test::TestRequest::post()
            .uri("/api/feed/0/comments")
            .insert_header(("Authorization", bearer_token_for(author_id)))
            .set_json(serde_json::json!({ "text": "hi" }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["status"], "success");
        assert_eq!(body["data"]["row_count"], 4);
        assert_eq!(body["data"]["comment"]["text"], "hi");
    }

    #[actix_web::test]
    async fn blank_comment_is_a_bad_request() {
        let (state, author_id) = seeded_state().await;
        let app = test::init_service(
            App::new()
                .app_data(state)
                .service(web::scope("/api").service(get_feed).service(submit_comment)),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/feed").to_request();
        let _: Value = test::call_and_read_body_json(&app, req).await;

        let req = test::TestRequest::post()
            .uri("/api/feed/0/comments")
            .insert_header(("Authorization", bearer_token_for(author_id)))
            .set_json(serde_json::json!({ "text": "   " }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn missing_token_is_unauthorized() {
        let (state, _) = seeded_state().await;
        let app = test::init_service(
            App::new()
                .app_data(state)
                .service(web::scope("/api").service(submit_comment)),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/feed/0/comments")
            .set_json(serde_json::json!({ "text": "hi" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn unknown_section_is_not_found() {
        let (state, _) = seeded_state().await;
        let app = test::init_service(
            App::new()
                .app_data(state)
                .service(web::scope("/api").service(get_feed).service(list_section_rows)),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/feed").to_request();
        let _: Value = test::call_and_read_body_json(&app, req).await;

        let req = test::TestRequest::get().uri("/api/feed/9/rows").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::NOT_FOUND);
    }
}
