//! HTTP routes for portal markups and comments.

use std::sync::Arc;

use axum::{
    Router,
    middleware::from_fn,
    routing::{get, post},
};

pub mod comments;
pub mod error;
pub mod markups;
pub mod middleware;
pub mod store;

use store::Store;

pub type AppState = Arc<AppStateInner>;

#[derive(Default)]
pub struct AppStateInner {
    pub store: Store,
}

/// All markup routes, with caller identity resolved from headers.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/markups",
            get(markups::list_markups)
                .post(markups::create_markup)
                .delete(markups::delete_markup),
        )
        .route("/markups/comments", post(comments::create_markup_comment))
        .route("/comments", post(comments::create_general_comment))
        .layer(from_fn(middleware::resolve_actor))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode};
    use http_body_util::BodyExt;
    use portal_types::api::{
        ApiResponse, HEADER_USER_ID, HEADER_USER_NAME, HEADER_VISITOR_NAME, MarkupList,
    };
    use portal_types::{GeneralComment, Markup, MarkupComment};
    use serde::de::DeserializeOwned;
    use serde_json::{Value, json};
    use tower::ServiceExt;
    use uuid::Uuid;

    use super::*;

    const OWNER_ID: &str = "00000000-0000-0000-0000-00000000beef";

    async fn call(
        app: &Router,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut req = Request::builder()
            .method(method)
            .uri(uri)
            .header(HEADER_USER_ID, OWNER_ID)
            .header(HEADER_USER_NAME, "Morgan Reyes");
        let body = match body {
            Some(v) => {
                req = req.header("content-type", "application/json");
                Body::from(v.to_string())
            }
            None => Body::empty(),
        };
        let resp = app.clone().oneshot(req.body(body).unwrap()).await.unwrap();
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn content<T: DeserializeOwned>(value: Value) -> T {
        serde_json::from_value::<ApiResponse<T>>(value)
            .unwrap()
            .into_result()
            .unwrap()
    }

    fn drawing(attachment_id: Uuid) -> Value {
        json!({
            "attachmentId": attachment_id,
            "type": "DRAWING",
            "canvasData": [{"x": 1.0, "y": 2.0}, {"x": 3.0, "y": 4.0}],
            "color": "#3b82f6",
            "strokeWidth": 5
        })
    }

    #[tokio::test]
    async fn create_list_delete_round_trip() {
        let app = router(AppState::default());
        let attachment_id = Uuid::new_v4();

        let (status, body) = call(&app, Method::POST, "/markups", Some(drawing(attachment_id))).await;
        assert_eq!(status, StatusCode::OK);
        let markup: Markup = content(body);
        assert_eq!(markup.stroke_width, 5);
        assert_eq!(markup.author.user_name.as_deref(), Some("Morgan Reyes"));

        let uri = format!("/markups?attachmentId={attachment_id}");
        let (_, body) = call(&app, Method::GET, &uri, None).await;
        let list: MarkupList = content(body);
        assert_eq!(list.markups.len(), 1);
        assert!(list.general_comments.is_empty());

        let (status, body) = call(
            &app,
            Method::DELETE,
            "/markups",
            Some(json!({ "markupId": markup.id })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["content"]["markupId"], json!(markup.id));

        let (_, body) = call(&app, Method::GET, &uri, None).await;
        assert!(content::<MarkupList>(body).markups.is_empty());
    }

    #[tokio::test]
    async fn errors_use_the_envelope() {
        let app = router(AppState::default());

        let (status, body) = call(
            &app,
            Method::DELETE,
            "/markups",
            Some(json!({ "markupId": Uuid::new_v4() })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["err"], "Markup not found");
        assert!(body.get("content").is_none());

        let (status, body) = call(
            &app,
            Method::POST,
            "/comments",
            Some(json!({ "attachmentId": Uuid::new_v4(), "text": "   " })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["err"].is_string());

        let (status, body) = call(&app, Method::POST, "/markups", Some(json!({ "type": "DRAWING" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["err"].is_string());
    }

    #[tokio::test]
    async fn pin_then_comment() {
        let app = router(AppState::default());
        let attachment_id = Uuid::new_v4();

        let (status, _) = call(
            &app,
            Method::POST,
            "/markups",
            Some(json!({ "attachmentId": attachment_id, "type": "COMMENT", "canvasData": [] })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, body) = call(
            &app,
            Method::POST,
            "/markups",
            Some(json!({
                "attachmentId": attachment_id,
                "type": "COMMENT",
                "canvasData": [],
                "position": {"x": 120.0, "y": 80.0}
            })),
        )
        .await;
        let pin: Markup = content(body);

        let (_, body) = call(
            &app,
            Method::POST,
            "/markups/comments",
            Some(json!({ "markupId": pin.id, "text": "fix this logo" })),
        )
        .await;
        let comment: MarkupComment = content(body);
        assert_eq!(comment.markup_id, pin.id);

        let (_, body) = call(&app, Method::GET, &format!("/markups?attachmentId={attachment_id}"), None).await;
        let list: MarkupList = content(body);
        assert_eq!(list.markups[0].pin_text(), Some("fix this logo"));
    }

    #[tokio::test]
    async fn visitors_are_recorded_by_name() {
        let app = router(AppState::default());
        let attachment_id = Uuid::new_v4();
        let req = Request::builder()
            .method(Method::POST)
            .uri("/comments")
            .header(HEADER_VISITOR_NAME, "Dana Scully")
            .header("content-type", "application/json")
            .body(Body::from(
                json!({ "attachmentId": attachment_id, "text": "Looks great" }).to_string(),
            ))
            .unwrap();
        let resp = app.clone().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let comment: GeneralComment = content(serde_json::from_slice(&bytes).unwrap());

        assert_eq!(comment.author.user_id, None);
        assert_eq!(comment.author.visitor_name.as_deref(), Some("Dana Scully"));
        assert_eq!(comment.text, "Looks great");
    }
}
