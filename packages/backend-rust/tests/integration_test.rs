use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use chrono::{DateTime, Duration, Utc};
use repitis_algo::MemoryParams;

mod common;

#[tokio::test]
async fn test_health_endpoints() {
    let app = common::create_test_app().await;

    let (status, body) = app.get("/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["database"], "connected");

    let (status, _) = app.get("/health/live", None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.get("/health/ready", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["checks"]["cache"], "disabled");

    let (status, body) = app.get("/health/info", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["levels"], 10);
}

#[tokio::test]
async fn test_unauthorized_without_token() {
    let app = common::create_test_app().await;

    let (status, body) = app.get("/api/v1/cards/next", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_rejects_token_signed_with_other_secret() {
    let app = common::create_test_app().await;
    let forged = repitis_backend::auth::sign_jwt_hs256("intruder", "not-the-secret", 3600).unwrap();

    let response = app
        .send(
            Request::builder()
                .uri("/api/v1/stats")
                .header(header::AUTHORIZATION, format!("Bearer {forged}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_unknown_route_is_json_404() {
    let app = common::create_test_app().await;

    let (status, body) = app.get("/api/v2/nothing", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_new_user_first_card_and_review() {
    let app = common::create_test_app().await;
    let before = Utc::now();

    let next = app.next_card("ana").await;
    assert_eq!(next["session_complete"], false);
    assert_eq!(next["card"]["id"], "l1-a");
    assert_eq!(next["card"]["content"], "A");
    assert_eq!(next["card"]["content_type"], "letter");
    assert_eq!(next["card"]["level_id"], 1);
    assert_eq!(next["card"]["is_new"], true);

    // Asking again without reviewing shows the same card.
    let again = app.next_card("ana").await;
    assert_eq!(again["card"]["id"], "l1-a");

    let (status, body) = app.review("ana", "l1-a", 4).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["success"], true);
    let next_review: DateTime<Utc> = body["next_review"]
        .as_str()
        .unwrap()
        .parse()
        .unwrap();
    // An "easy" first review waits at least the initial easy stability.
    let easy_days = MemoryParams::default().initial_stability_by_rating[3];
    let min_wait = Duration::hours((easy_days * 24.0).floor() as i64);
    assert!(
        next_review - before >= min_wait,
        "next review {next_review} is sooner than {min_wait} after {before}"
    );

    let next = app.next_card("ana").await;
    assert_eq!(next["card"]["id"], "l1-e");
    assert_eq!(next["card"]["is_new"], true);
}

#[tokio::test]
async fn test_duplicate_review_is_stale() {
    let app = common::create_test_app().await;

    app.next_card("ben").await;
    let (status, _) = app.review("ben", "l1-a", 4).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.review("ben", "l1-a", 4).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "STALE_REVIEW");

    // Only one review was applied.
    let (_, stats) = app.get("/api/v1/stats", Some("ben")).await;
    assert_eq!(stats["total_reviews"], 1);
}

#[tokio::test]
async fn test_review_of_card_not_presented_is_stale() {
    let app = common::create_test_app().await;

    app.next_card("cleo").await;
    let (status, body) = app.review("cleo", "l1-e", 3).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "STALE_REVIEW");
}

#[tokio::test]
async fn test_review_validation_errors() {
    let app = common::create_test_app().await;
    app.next_card("dani").await;

    let (status, body) = app.review("dani", "l1-a", 5).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_RATING");

    let (status, body) = app.review("dani", "l1-a", 0).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_RATING");

    let (status, body) = app
        .post_json("/api/v1/cards/l1-a/review", "dani", "{\"rating\": \"good\"}")
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, body) = app.review("dani", "no-such-card", 3).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");

    // The presented card is still reviewable after the rejected attempts.
    let (status, _) = app.review("dani", "l1-a", 3).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_levels_for_new_user() {
    let app = common::create_test_app().await;

    let (status, body) = app.get("/api/v1/levels", Some("eva")).await;
    assert_eq!(status, StatusCode::OK);
    let levels = body.as_array().unwrap();
    assert_eq!(levels.len(), 10);
    assert_eq!(levels[0]["name"], "Vocales");
    assert_eq!(levels[0]["is_unlocked"], true);
    assert_eq!(levels[0]["mastery_threshold"], 80.0);
    assert!(levels[1..].iter().all(|level| level["is_unlocked"] == false));
    assert!(levels.iter().all(|level| level["progress_percentage"] == 0.0));
}

#[tokio::test]
async fn test_stats_reflect_reviews() {
    let app = common::create_test_app().await;

    let (status, stats) = app.get("/api/v1/stats", Some("fer")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["total_reviews"], 0);
    assert_eq!(stats["current_streak"], 0);
    assert_eq!(stats["current_level"], 1);
    assert_eq!(stats["level_progress"].as_array().unwrap().len(), 10);

    for expected in ["l1-a", "l1-e"] {
        let next = app.next_card("fer").await;
        assert_eq!(next["card"]["id"], expected);
        let (status, _) = app.review("fer", expected, 3).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (_, stats) = app.get("/api/v1/stats", Some("fer")).await;
    assert_eq!(stats["total_reviews"], 2);
    assert_eq!(stats["today_reviews"], 2);
    assert_eq!(stats["current_streak"], 1);
    assert_eq!(stats["longest_streak"], 1);
    assert_eq!(stats["level_progress"][0]["level_name"], "Vocales");
    assert_eq!(stats["level_progress"][0]["mastered_cards"], 0);

    let (status, today) = app.get("/api/v1/stats/today", Some("fer")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(today["new_cards_today"], 2);
    assert_eq!(today["total_reviews_today"], 2);
}

#[tokio::test]
async fn test_sitting_cap_completes_session() {
    let app = common::create_test_app_with(|config| {
        config.session.new_cards_per_sitting = 2;
    })
    .await;

    for _ in 0..2 {
        let next = app.next_card("gil").await;
        let card_id = next["card"]["id"].as_str().unwrap().to_string();
        let (status, _) = app.review("gil", &card_id, 3).await;
        assert_eq!(status, StatusCode::OK);
    }

    let done = app.next_card("gil").await;
    assert_eq!(done["session_complete"], true);
    assert!(done["card"].is_null());
    assert!(done["message"].is_string());

    let still_done = app.next_card("gil").await;
    assert_eq!(still_done["session_complete"], true);
}

#[tokio::test]
async fn test_daily_cap_completes_session() {
    let app = common::create_test_app_with(|config| {
        config.session.new_cards_per_day = 1;
    })
    .await;

    let next = app.next_card("hugo").await;
    assert_eq!(next["card"]["id"], "l1-a");
    let (status, _) = app.review("hugo", "l1-a", 3).await;
    assert_eq!(status, StatusCode::OK);

    let done = app.next_card("hugo").await;
    assert_eq!(done["session_complete"], true);
    assert!(done["message"].as_str().unwrap().contains("hoy"));
}

#[tokio::test]
async fn test_learners_are_isolated() {
    let app = common::create_test_app().await;

    app.next_card("ines").await;
    let (status, _) = app.review("ines", "l1-a", 3).await;
    assert_eq!(status, StatusCode::OK);

    let other = app.next_card("juan").await;
    assert_eq!(other["card"]["id"], "l1-a");
    assert_eq!(other["card"]["is_new"], true);

    let (_, stats) = app.get("/api/v1/stats", Some("juan")).await;
    assert_eq!(stats["total_reviews"], 0);
}
