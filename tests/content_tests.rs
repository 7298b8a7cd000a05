//! End-to-end tests for the review editor, public pages and site settings.

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
    response::Response,
};
use ditchfork::config::Config;
use ditchfork::models::review::Category;
use ditchfork::state::SharedState;
use http_body_util::BodyExt;
use sea_orm::ConnectionTrait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tower::ServiceExt;

const BOUNDARY: &str = "ditchforkboundary";

struct TestApp {
    state: Arc<SharedState>,
    router: Router,
    token: String,
    upload_dir: PathBuf,
}

async fn spawn_app() -> TestApp {
    let db_path =
        std::env::temp_dir().join(format!("ditchfork-content-test-{}.db", uuid::Uuid::new_v4()));
    let upload_dir =
        std::env::temp_dir().join(format!("ditchfork-content-uploads-{}", uuid::Uuid::new_v4()));

    let mut config = Config::default();
    config.general.database_path = format!("sqlite:{}", db_path.display());
    config.storage.upload_dir = upload_dir.display().to_string();
    config.security.argon2_memory_cost_kib = 1024;
    config.security.argon2_time_cost = 1;

    let state = Arc::new(
        SharedState::new(config, None)
            .await
            .expect("failed to create app state"),
    );
    state
        .auth
        .create_user("editor", "password123")
        .await
        .expect("failed to create admin");
    let router = ditchfork::web::router(state.clone());

    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/admin/login")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from("username=editor&password=password123"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let token = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("ditchfork_session="))
        .and_then(|v| v.split(';').next())
        .unwrap()
        .to_string();

    TestApp {
        state,
        router,
        token,
        upload_dir,
    }
}

/// A file part for the `cover` field: (filename, content type, bytes).
type Cover<'a> = (&'a str, &'a str, &'a [u8]);

fn multipart_body(fields: &[(&str, &str)], cover: Option<Cover<'_>>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((file_name, content_type, bytes)) = cover {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"cover\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

impl TestApp {
    async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    async fn get(&self, uri: &str) -> Response {
        self.send(
            Request::builder()
                .uri(uri)
                .header(header::COOKIE, format!("ditchfork_session={}", self.token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    async fn post_multipart(
        &self,
        uri: &str,
        fields: &[(&str, &str)],
        cover: Option<Cover<'_>>,
    ) -> Response {
        self.send(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::COOKIE, format!("ditchfork_session={}", self.token))
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={BOUNDARY}"),
                )
                .body(Body::from(multipart_body(fields, cover)))
                .unwrap(),
        )
        .await
    }

    async fn post_form(&self, uri: &str, body: &str) -> Response {
        self.send(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::COOKIE, format!("ditchfork_session={}", self.token))
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    async fn create_album(&self, artist: &str, title: &str) -> Response {
        self.post_multipart(
            "/admin/reviews",
            &[
                ("category", "albums"),
                ("artist", artist),
                ("title", title),
                ("subheader", ""),
                ("rating", "8.1"),
                ("body", "<p>Loud and bright.</p>"),
            ],
            None,
        )
        .await
    }

    async fn slugs(&self, category: Category) -> Vec<String> {
        let mut slugs: Vec<String> = self
            .state
            .store
            .list_reviews(Some(category))
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.slug)
            .collect();
        slugs.sort();
        slugs
    }
}

fn count_files(dir: &Path) -> usize {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return 0;
    };
    entries
        .flatten()
        .map(|entry| {
            let path = entry.path();
            if path.is_dir() { count_files(&path) } else { 1 }
        })
        .sum()
}

async fn body_text(response: Response) -> String {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8_lossy(&body).into_owned()
}

#[tokio::test]
async fn duplicate_titles_get_numbered_slugs_per_category() {
    let app = spawn_app().await;

    assert_eq!(app.create_album("X", "Y").await.status(), StatusCode::SEE_OTHER);
    assert_eq!(app.create_album("X", "Y").await.status(), StatusCode::SEE_OTHER);
    assert_eq!(app.slugs(Category::Albums).await, vec!["x-y", "x-y-2"]);

    let song = app
        .post_multipart(
            "/admin/reviews",
            &[
                ("category", "songs"),
                ("artist", "X"),
                ("title", "Y"),
                ("rating", "7"),
                ("body", ""),
            ],
            None,
        )
        .await;
    assert_eq!(song.status(), StatusCode::SEE_OTHER);
    assert_eq!(app.slugs(Category::Songs).await, vec!["x-y"]);

    let page = app.get("/music/albums/x-y-2").await;
    assert_eq!(page.status(), StatusCode::OK);
    assert!(body_text(page).await.contains("<p>Loud and bright.</p>"));
}

#[tokio::test]
async fn editing_keeps_slug_and_cover() {
    let app = spawn_app().await;

    let png = b"\x89PNG\r\n\x1a\nfake";
    let created = app
        .post_multipart(
            "/admin/reviews",
            &[
                ("category", "albums"),
                ("artist", "Big Thief"),
                ("title", "Dragon"),
                ("rating", "9.1"),
                ("body", "first"),
            ],
            Some(("dragon.png", "image/png", png)),
        )
        .await;
    assert_eq!(created.status(), StatusCode::SEE_OTHER);

    let review = app
        .state
        .store
        .get_review_by_slug(Category::Albums, "big-thief-dragon")
        .await
        .unwrap()
        .unwrap();
    assert!(review.cover_path.ends_with(".png"));
    assert!(app.upload_dir.join(&review.cover_path).exists());

    let cover = app.get(&format!("/uploads/{}", review.cover_path)).await;
    assert_eq!(cover.status(), StatusCode::OK);

    let updated = app
        .post_multipart(
            &format!("/admin/albums/{}", review.id),
            &[
                ("artist", "Big Thief"),
                ("title", "Dragon"),
                ("rating", "9.3"),
                ("body", "second"),
            ],
            Some(("", "application/octet-stream", b"")),
        )
        .await;
    assert_eq!(updated.status(), StatusCode::SEE_OTHER);

    let after = app
        .state
        .store
        .get_review(Category::Albums, review.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(after.slug, "big-thief-dragon");
    assert_eq!(after.cover_path, review.cover_path);
    assert_eq!(after.body, "second");
    assert!((after.rating - 9.3).abs() < f64::EPSILON);
}

#[tokio::test]
async fn failed_saves_leave_no_orphaned_cover() {
    let app = spawn_app().await;
    assert_eq!(
        app.create_album("Mitski", "Laurel Hell").await.status(),
        StatusCode::SEE_OTHER
    );
    let review = app
        .state
        .store
        .get_review_by_slug(Category::Albums, "mitski-laurel-hell")
        .await
        .unwrap()
        .unwrap();

    for event in ["INSERT", "UPDATE"] {
        app.state
            .store
            .conn
            .execute_unprepared(&format!(
                "CREATE TRIGGER reject_{event} BEFORE {event} ON reviews \
                 BEGIN SELECT RAISE(ABORT, 'writes disabled'); END"
            ))
            .await
            .unwrap();
    }

    let png: &[u8] = b"\x89PNG\r\n\x1a\nfake";
    let created = app
        .post_multipart(
            "/admin/reviews",
            &[
                ("category", "albums"),
                ("artist", "Mitski"),
                ("title", "Be The Cowboy"),
                ("rating", "8.8"),
                ("body", ""),
            ],
            Some(("cowboy.png", "image/png", png)),
        )
        .await;
    assert_eq!(created.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let updated = app
        .post_multipart(
            &format!("/admin/albums/{}", review.id),
            &[
                ("artist", "Mitski"),
                ("title", "Laurel Hell"),
                ("rating", "8.0"),
                ("body", ""),
            ],
            Some(("laurel.png", "image/png", png)),
        )
        .await;
    assert_eq!(updated.status(), StatusCode::INTERNAL_SERVER_ERROR);

    assert_eq!(count_files(&app.upload_dir), 0);
    let after = app
        .state
        .store
        .get_review(Category::Albums, review.id)
        .await
        .unwrap()
        .unwrap();
    assert!(after.cover_path.is_empty());
}

#[tokio::test]
async fn invalid_entries_are_rejected() {
    let app = spawn_app().await;

    let missing_artist = app
        .post_multipart(
            "/admin/reviews",
            &[("category", "albums"), ("title", "Untitled"), ("rating", "5")],
            None,
        )
        .await;
    assert_eq!(missing_artist.status(), StatusCode::BAD_REQUEST);
    assert!(body_text(missing_artist).await.contains("Artist is required"));

    let out_of_range = app
        .post_multipart(
            "/admin/reviews",
            &[
                ("category", "songs"),
                ("artist", "A"),
                ("title", "B"),
                ("rating", "11"),
            ],
            None,
        )
        .await;
    assert_eq!(out_of_range.status(), StatusCode::BAD_REQUEST);

    let bad_cover = app
        .post_multipart(
            "/admin/reviews",
            &[("category", "articles"), ("title", "News Roundup")],
            Some(("notes.txt", "text/plain", b"hello")),
        )
        .await;
    assert_eq!(bad_cover.status(), StatusCode::BAD_REQUEST);

    assert!(app.state.store.list_reviews(None).await.unwrap().is_empty());
}

#[tokio::test]
async fn deleted_entries_disappear_from_public_pages() {
    let app = spawn_app().await;
    app.create_album("Wednesday", "Rat Saw God").await;

    let review = app
        .state
        .store
        .get_review_by_slug(Category::Albums, "wednesday-rat-saw-god")
        .await
        .unwrap()
        .unwrap();

    let home = app.get("/").await;
    assert!(body_text(home).await.contains("Rat Saw God"));

    let deleted = app
        .post_form(&format!("/admin/albums/{}/delete", review.id), "")
        .await;
    assert_eq!(deleted.status(), StatusCode::SEE_OTHER);

    let page = app.get("/music/albums/wednesday-rat-saw-god").await;
    assert_eq!(page.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn home_tabs_filter_by_category() {
    let app = spawn_app().await;
    app.create_album("Album Artist", "Album Title").await;
    app.post_multipart(
        "/admin/reviews",
        &[
            ("category", "articles"),
            ("title", "Best Of The Year"),
            ("article_type", "List"),
        ],
        None,
    )
    .await;

    let articles = body_text(app.get("/?tab=articles").await).await;
    assert!(articles.contains("Best Of The Year"));
    assert!(!articles.contains("Album Title"));

    let all = body_text(app.get("/").await).await;
    assert!(all.contains("Best Of The Year"));
    assert!(all.contains("Album Title"));

    let empty = app.get("/?tab=").await;
    assert_eq!(empty.status(), StatusCode::OK);
    assert!(body_text(empty).await.contains("Album Title"));

    assert_eq!(app.get("/?tab=podcasts").await.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        app.get("/music/podcasts/anything").await.status(),
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn settings_accept_known_keys_only() {
    let app = spawn_app().await;

    let saved = app
        .post_form("/admin/settings", "site_title=Night+Shift&accent_color=")
        .await;
    assert_eq!(saved.status(), StatusCode::SEE_OTHER);

    let settings = app.state.store.get_settings().await.unwrap();
    assert_eq!(settings.site_title(), "Night Shift");
    assert_eq!(settings.get("accent_color"), "#d62828");

    let rejected = app
        .post_form("/admin/settings", "site_title=Other&favicon=x.ico")
        .await;
    assert_eq!(rejected.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        app.state.store.get_settings().await.unwrap().site_title(),
        "Night Shift"
    );

    let home = body_text(app.get("/").await).await;
    assert!(home.contains("Night Shift"));
}
