use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use axum::routing::get;
use image::{ImageFormat, Rgba, RgbaImage};
use portal_api::AppState;
use portal_markup::canvas::{BackgroundLayer, DisplayList, DrawOp};
use portal_markup::{
    HttpMarkupApi, Layout, MarkupApi, Notice, ReviewConfig, ReviewError, ReviewSession, Tool,
    ViewerEvent,
};
use portal_types::api::{CreateGeneralCommentRequest, CreateMarkupCommentRequest, CreateMarkupRequest};
use portal_types::{Actor, Attachment, MarkupType, Point};
use uuid::Uuid;

fn png(width: u32, height: u32) -> Vec<u8> {
    let image = RgbaImage::from_pixel(width, height, Rgba([200, 200, 200, 255]));
    let mut out = Cursor::new(Vec::new());
    image.write_to(&mut out, ImageFormat::Png).unwrap();
    out.into_inner()
}

/// Serve the markup routes plus one image file on an ephemeral port.
async fn serve() -> String {
    let file = png(40, 30);
    let app = portal_api::router(AppState::default()).route(
        "/files/mockup.png",
        get(move || {
            let file = file.clone();
            async move { file }
        }),
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

/// Accept connections and never answer them.
async fn serve_silence() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    format!("http://{addr}")
}

fn config(base: &str) -> ReviewConfig {
    ReviewConfig {
        api_base_url: base.to_string(),
        ..ReviewConfig::default()
    }
}

fn owner() -> Actor {
    Actor::Owner {
        user_id: Uuid::new_v4(),
        name: "Morgan Reyes".into(),
    }
}

#[tokio::test]
async fn client_speaks_the_envelope() {
    let base = serve().await;
    let api = HttpMarkupApi::new(&config(&base), &owner()).unwrap();
    let attachment_id = Uuid::new_v4();

    let pin = api
        .create_markup(CreateMarkupRequest {
            attachment_id,
            kind: MarkupType::Comment,
            canvas_data: Vec::new(),
            color: Some("#22c55e".into()),
            stroke_width: None,
            position: Some(Point::new(120.0, 80.0)),
        })
        .await
        .unwrap();
    assert_eq!(pin.author.user_name.as_deref(), Some("Morgan Reyes"));

    api.create_markup_comment(CreateMarkupCommentRequest {
        markup_id: pin.id,
        text: "fix this logo".into(),
    })
    .await
    .unwrap();

    let visitor = HttpMarkupApi::new(&config(&base), &Actor::Visitor { name: Some("Dana".into()) }).unwrap();
    let comment = visitor
        .create_general_comment(CreateGeneralCommentRequest {
            attachment_id,
            text: "Looks great".into(),
        })
        .await
        .unwrap();
    assert_eq!(comment.author.visitor_name.as_deref(), Some("Dana"));

    let list = api.list(attachment_id).await.unwrap();
    assert_eq!(list.markups.len(), 1);
    assert_eq!(list.markups[0].pin_text(), Some("fix this logo"));
    assert_eq!(list.general_comments.len(), 1);

    api.delete_markup(pin.id).await.unwrap();
    match api.delete_markup(pin.id).await {
        Err(ReviewError::Server(message)) => assert_eq!(message, "Markup not found"),
        other => panic!("expected server error, got {other:?}"),
    }
}

#[tokio::test]
async fn unreachable_service_is_a_transport_error() {
    // Port 9 (discard) is closed on test machines.
    let api = HttpMarkupApi::new(&config("http://127.0.0.1:9"), &owner()).unwrap();
    let err = api.list(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, ReviewError::Transport(_) | ReviewError::Timeout), "{err:?}");
}

#[tokio::test]
async fn session_draws_over_the_fetched_background() {
    let base = serve().await;
    let attachment = Attachment {
        id: Uuid::new_v4(),
        url: format!("{base}/files/mockup.png"),
        content_type: "image/png".into(),
        path: "portal/7/mockup.png".into(),
    };

    let mut session = ReviewSession::connect(&config(&base), attachment, owner(), Layout::Desktop)
        .await
        .unwrap();
    assert!(!session.is_loading());
    assert!(matches!(session.background(), BackgroundLayer::Image(_)));

    let rect = portal_markup::geometry::CanvasRect::new(0.0, 0.0, 400.0, 300.0);
    session.set_tool(Tool::Draw);
    session.pointer_down(rect, Point::new(5.0, 5.0));
    session.pointer_move(rect, Point::new(50.0, 40.0));
    let markup = session.pointer_up().await.unwrap();

    // A second viewer picks the stroke up when opening.
    let other = ReviewSession::open(
        Arc::new(HttpMarkupApi::new(&config(&base), &owner()).unwrap()),
        session.attachment().clone(),
        owner(),
        Layout::Mobile,
        ReviewConfig::default().poll_policy(),
    )
    .await;
    assert_eq!(other.snapshot().markups[0].id, markup.id);

    let mut canvas = DisplayList::new(400.0, 300.0);
    other.render(&mut canvas);
    // Opened without fetching the file, so no image op before the stroke.
    assert_eq!(canvas.ops[0], DrawOp::Clear);
    match &canvas.ops[1] {
        DrawOp::Polyline { points, .. } => assert_eq!(points, &markup.canvas_data),
        op => panic!("expected stroke, got {op:?}"),
    }

    other.close().await;
    session.close().await;
}

#[tokio::test]
async fn hung_comment_post_times_out_and_rolls_back() {
    let base = serve_silence().await;
    let config = ReviewConfig {
        request_timeout: Duration::from_secs(1),
        active_interval: Duration::from_secs(600),
        idle_interval: Duration::from_secs(600),
        ..config(&base)
    };
    let api = Arc::new(HttpMarkupApi::new(&config, &owner()).unwrap());
    assert!(matches!(api.list(Uuid::new_v4()).await, Err(ReviewError::Timeout)));

    let attachment = Attachment {
        id: Uuid::new_v4(),
        url: format!("{base}/files/brief.pdf"),
        content_type: "application/pdf".into(),
        path: "portal/7/brief.pdf".into(),
    };
    let session = ReviewSession::open(api, attachment, owner(), Layout::Desktop, config.poll_policy()).await;
    let mut events = session.subscribe();

    session.set_composer("Looks great");
    assert!(!session.submit_comment().await);

    let state = session.snapshot();
    assert!(!state.submitting_comment);
    assert!(state.optimistic.is_empty());
    assert_eq!(state.composer, "Looks great");
    assert!(session.feed().is_empty());

    let mut notices = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let ViewerEvent::Notice(notice) = event {
            notices.push(notice);
        }
    }
    assert_eq!(notices, vec![Notice::error("Failed to post comment")]);

    session.close().await;
}
