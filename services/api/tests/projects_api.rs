//! End-to-end project catalogue scenarios against a real database
//!
//! These need `DATABASE_URL` to point at a PostgreSQL server where test
//! databases can be created; run them with `cargo test -- --ignored`.

mod support;

use api::repositories::ProjectRepository;
use axum::http::{Method, StatusCode};
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde_json::{Value, json};
use sqlx::PgPool;
use support::{body_json, build_test_app, delete, get, insert_user, post_json, send_json};
use uuid::Uuid;

async fn create_project(pool: &PgPool, body: Value) -> Value {
    let response = post_json(build_test_app(pool.clone()), "/projects", body).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await
}

fn id_of(project: &Value) -> String {
    project["id"].as_str().unwrap().to_string()
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a running PostgreSQL instance"]
async fn create_fills_in_defaults(pool: PgPool) {
    let user = insert_user(&pool, "editor").await;

    let project = create_project(&pool, json!({ "name": "Demo", "created_by": user })).await;

    assert_eq!(project["name"], "Demo");
    assert_eq!(project["slug"], "demo");
    assert_eq!(project["status"], "draft");
    assert_eq!(project["duration_seconds"], 0.0);
    assert_eq!(project["tags"], json!([]));
    assert_eq!(project["is_favorite"], false);
    assert_eq!(project["author_username"], "editor");
    assert!(project.get("deleted_at").is_none());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a running PostgreSQL instance"]
async fn create_rejects_unknown_creator_and_duplicate_slug(pool: PgPool) {
    let response = post_json(
        build_test_app(pool.clone()),
        "/projects",
        json!({ "name": "Orphan", "created_by": Uuid::new_v4() }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let user = insert_user(&pool, "editor").await;
    create_project(&pool, json!({ "name": "Trailer", "created_by": user })).await;
    let response = post_json(
        build_test_app(pool.clone()),
        "/projects",
        json!({ "name": "Trailer", "created_by": user }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a running PostgreSQL instance"]
async fn list_all_returns_newest_first(pool: PgPool) {
    let user = insert_user(&pool, "editor").await;
    for name in ["First", "Second", "Third"] {
        create_project(&pool, json!({ "name": name, "created_by": user })).await;
    }

    let response = get(build_test_app(pool.clone()), "/projects?status=all").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["total"], 3);
    assert_eq!(body["page"], 1);
    assert_eq!(body["limit"], 12);
    assert_eq!(body["hasMore"], false);

    let names: Vec<&str> = body["projects"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Third", "Second", "First"]);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a running PostgreSQL instance"]
async fn pages_agree_with_total(pool: PgPool) {
    let user = insert_user(&pool, "editor").await;
    for i in 0..5 {
        create_project(&pool, json!({ "name": format!("Clip {i}"), "created_by": user })).await;
    }

    let mut seen = Vec::new();
    for page in 1..=3 {
        let uri = format!("/projects?limit=2&page={page}&sort_by=name&sort_order=asc");
        let body = body_json(get(build_test_app(pool.clone()), &uri).await).await;

        assert_eq!(body["total"], 5);
        assert_eq!(body["hasMore"], page < 3);
        for project in body["projects"].as_array().unwrap() {
            seen.push(project["name"].as_str().unwrap().to_string());
        }
    }

    assert_eq!(seen, vec!["Clip 0", "Clip 1", "Clip 2", "Clip 3", "Clip 4"]);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a running PostgreSQL instance"]
async fn filters_narrow_the_listing(pool: PgPool) {
    let alice = insert_user(&pool, "alice").await;
    let bob = insert_user(&pool, "bob").await;

    create_project(
        &pool,
        json!({
            "name": "100% Cotton",
            "created_by": alice,
            "tags": ["fashion", "promo"],
            "difficulty_level": "beginner",
        }),
    )
    .await;
    create_project(
        &pool,
        json!({
            "name": "1000 Cuts",
            "created_by": bob,
            "status": "review",
            "tags": ["montage"],
        }),
    )
    .await;

    let total = |body: Value| body["total"].as_i64().unwrap();
    let app = || build_test_app(pool.clone());

    assert_eq!(total(body_json(get(app(), "/projects?search=100%25").await).await), 1);
    assert_eq!(total(body_json(get(app(), "/projects?search=cuts").await).await), 1);
    assert_eq!(total(body_json(get(app(), "/projects?search=100").await).await), 2);
    assert_eq!(total(body_json(get(app(), "/projects?status=review").await).await), 1);
    assert_eq!(total(body_json(get(app(), "/projects?tags=promo,montage").await).await), 2);
    assert_eq!(total(body_json(get(app(), "/projects?tags=montage").await).await), 1);
    assert_eq!(
        total(body_json(get(app(), "/projects?difficulty_level=beginner").await).await),
        1
    );
    let uri = format!("/projects?created_by={bob}");
    assert_eq!(total(body_json(get(app(), &uri).await).await), 1);
    assert_eq!(
        total(body_json(get(app(), "/projects?date_to=2000-01-01T00:00:00Z").await).await),
        0
    );
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a running PostgreSQL instance"]
async fn date_range_bounds_are_inclusive(pool: PgPool) {
    let user = insert_user(&pool, "editor").await;
    let project = create_project(&pool, json!({ "name": "Edge", "created_by": user })).await;
    let created_at: DateTime<Utc> = project["created_at"].as_str().unwrap().parse().unwrap();
    let stamp = |at: DateTime<Utc>| at.to_rfc3339_opts(SecondsFormat::Micros, true);
    let total = |body: Value| body["total"].as_i64().unwrap();
    let app = || build_test_app(pool.clone());

    let exact = stamp(created_at);
    let uri = format!("/projects?date_from={exact}&date_to={exact}");
    assert_eq!(total(body_json(get(app(), &uri).await).await), 1);

    let before = stamp(created_at - Duration::microseconds(1));
    let uri = format!("/projects?date_to={before}");
    assert_eq!(total(body_json(get(app(), &uri).await).await), 0);

    let after = stamp(created_at + Duration::microseconds(1));
    let uri = format!("/projects?date_from={after}");
    assert_eq!(total(body_json(get(app(), &uri).await).await), 0);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a running PostgreSQL instance"]
async fn soft_deleted_projects_disappear(pool: PgPool) {
    let user = insert_user(&pool, "editor").await;
    let project = create_project(&pool, json!({ "name": "Doomed", "created_by": user })).await;
    let uri = format!("/projects/{}", id_of(&project));

    let response = delete(build_test_app(pool.clone()), &uri).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = get(build_test_app(pool.clone()), &uri).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        body_json(response).await,
        json!({ "error": "Project not found" })
    );

    let body = body_json(get(build_test_app(pool.clone()), "/projects").await).await;
    assert_eq!(body["total"], 0);

    let response = delete(build_test_app(pool.clone()), &uri).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let stats = body_json(get(build_test_app(pool.clone()), "/projects/stats").await).await;
    assert_eq!(stats["total"], 0);

    // The row itself is kept.
    let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM projects")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(rows, 1);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a running PostgreSQL instance"]
async fn update_patches_fields(pool: PgPool) {
    let user = insert_user(&pool, "editor").await;
    let project = create_project(&pool, json!({ "name": "Rough Cut", "created_by": user })).await;
    let uri = format!("/projects/{}", id_of(&project));

    let response = send_json(
        build_test_app(pool.clone()),
        Method::PATCH,
        &uri,
        json!({
            "name": "Final Cut",
            "status": "published",
            "frame_rate": 23.976,
            "estimated_hours": 6.5,
            "tags": ["festival"],
            "created_by": Uuid::new_v4(),
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let updated = body_json(response).await;
    assert_eq!(updated["name"], "Final Cut");
    assert_eq!(updated["status"], "published");
    assert_eq!(updated["frame_rate"], 23.976);
    assert_eq!(updated["estimated_hours"], 6.5);
    assert_eq!(updated["tags"], json!(["festival"]));
    assert_eq!(updated["slug"], "rough-cut");
    assert_eq!(updated["created_by"], project["created_by"]);
    assert_ne!(updated["updated_at"], project["updated_at"]);

    let stored: String = sqlx::query_scalar("SELECT status FROM projects WHERE id = $1")
        .bind(Uuid::parse_str(&id_of(&project)).unwrap())
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(stored, "completed");

    let missing = format!("/projects/{}", Uuid::new_v4());
    let response = send_json(
        build_test_app(pool.clone()),
        Method::PATCH,
        &missing,
        json!({ "name": "Ghost" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a running PostgreSQL instance"]
async fn favorite_toggle_is_involutive(pool: PgPool) {
    let user = insert_user(&pool, "viewer").await;
    let project = create_project(&pool, json!({ "name": "Loved", "created_by": user })).await;
    let id = id_of(&project);
    let favorite = format!("/projects/{id}/favorite");

    let response = post_json(build_test_app(pool.clone()), &favorite, json!({ "userId": user })).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({ "isFavorite": true }));

    let uri = format!("/projects/{id}?userId={user}");
    let body = body_json(get(build_test_app(pool.clone()), &uri).await).await;
    assert_eq!(body["is_favorite"], true);

    let uri = format!("/projects?userId={user}");
    let body = body_json(get(build_test_app(pool.clone()), &uri).await).await;
    assert_eq!(body["projects"][0]["is_favorite"], true);

    let response = post_json(build_test_app(pool.clone()), &favorite, json!({ "userId": user })).await;
    assert_eq!(body_json(response).await, json!({ "isFavorite": false }));

    let likes: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM project_likes")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(likes, 0);

    let response = post_json(build_test_app(pool.clone()), &favorite, json!({ "userId": user })).await;
    assert_eq!(body_json(response).await, json!({ "isFavorite": true }));

    let missing = format!("/projects/{}/favorite", Uuid::new_v4());
    let response = post_json(build_test_app(pool.clone()), &missing, json!({ "userId": user })).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a running PostgreSQL instance"]
async fn views_are_counted_once_per_user(pool: PgPool) {
    let alice = insert_user(&pool, "alice").await;
    let bob = insert_user(&pool, "bob").await;
    let project = create_project(&pool, json!({ "name": "Watched", "created_by": alice })).await;
    let view = format!("/projects/{}/view", id_of(&project));

    for user in [alice, alice, bob] {
        let response = post_json(build_test_app(pool.clone()), &view, json!({ "userId": user })).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            json!({ "message": "View count incremented" })
        );
    }

    let stats = body_json(get(build_test_app(pool.clone()), "/projects/stats").await).await;
    assert_eq!(stats["total_views"], 2);

    let alice_views: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM project_views WHERE user_id = $1")
            .bind(alice)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(alice_views, 1);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a running PostgreSQL instance"]
async fn concurrent_toggles_never_duplicate_a_like(pool: PgPool) {
    let user = insert_user(&pool, "viewer").await;
    let project = create_project(&pool, json!({ "name": "Contested", "created_by": user })).await;
    let id = Uuid::parse_str(&id_of(&project)).unwrap();

    let repository = ProjectRepository::new(pool.clone());
    let (first, second) = tokio::join!(
        repository.toggle_favorite(id, user),
        repository.toggle_favorite(id, user),
    );
    let (first, second) = (first.unwrap(), second.unwrap());

    let likes: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM project_likes")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert!(likes <= 1);
    // Serialized toggles cancel out; overlapping ones both land on "liked".
    assert_eq!(likes == 1, first && second);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a running PostgreSQL instance"]
async fn count_matches_rows_for_any_filter(pool: PgPool) {
    let alice = insert_user(&pool, "alice").await;
    let bob = insert_user(&pool, "bob").await;
    for (name, status, owner) in [
        ("Alpha", "draft", alice),
        ("Beta", "review", alice),
        ("Gamma", "draft", bob),
        ("Delta", "archived", bob),
    ] {
        create_project(
            &pool,
            json!({ "name": name, "status": status, "created_by": owner, "tags": [status] }),
        )
        .await;
    }

    let filters = [
        String::new(),
        "status=draft".to_string(),
        format!("created_by={alice}"),
        "search=a&status=draft".to_string(),
        "tags=review,archived".to_string(),
        "search=nothing-matches".to_string(),
    ];
    for filter in filters {
        let uri = format!("/projects?{filter}");
        let body = body_json(get(build_test_app(pool.clone()), &uri).await).await;
        let total = body["total"].as_i64().unwrap();

        let uri = format!("/projects?{filter}&page=1&limit={}", total.max(1));
        let body = body_json(get(build_test_app(pool.clone()), &uri).await).await;
        let rows = body["projects"].as_array().unwrap().len() as i64;

        assert_eq!(rows, total, "{filter}");
        assert_eq!(body["hasMore"], false, "{filter}");
    }
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a running PostgreSQL instance"]
async fn stats_bucket_statuses(pool: PgPool) {
    let user = insert_user(&pool, "editor").await;
    let organization = Uuid::new_v4();
    for (name, status) in [
        ("One", "draft"),
        ("Two", "draft"),
        ("Three", "completed"),
        ("Four", "archived"),
    ] {
        create_project(
            &pool,
            json!({
                "name": name,
                "status": status,
                "duration_seconds": 30,
                "organization_id": organization,
                "created_by": user,
            }),
        )
        .await;
    }
    create_project(&pool, json!({ "name": "Elsewhere", "created_by": user })).await;

    let uri = format!("/projects/stats?organization_id={organization}");
    let stats = body_json(get(build_test_app(pool.clone()), &uri).await).await;

    assert_eq!(stats["total"], 4);
    assert_eq!(stats["draft"], 2);
    assert_eq!(stats["published"], 1);
    assert_eq!(stats["archived"], 1);
    assert_eq!(stats["in_progress"], 0);
    assert_eq!(stats["review"], 0);
    assert_eq!(stats["approved"], 0);
    assert_eq!(stats["others"], 0);
    assert_eq!(stats["total_duration"], 120.0);

    let stats = body_json(get(build_test_app(pool.clone()), "/projects/stats").await).await;
    assert_eq!(stats["total"], 5);
    assert_eq!(stats["draft"], 3);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a running PostgreSQL instance"]
async fn seed_only_fills_an_empty_catalogue(pool: PgPool) {
    let response = post_json(build_test_app(pool.clone()), "/seed", json!({})).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["projectsCreated"], 2);

    let response = post_json(build_test_app(pool.clone()), "/seed", json!({})).await;
    let body = body_json(response).await;
    assert_eq!(body["message"], "Database already has data");
    assert_eq!(body["count"], 2);

    let stats = body_json(get(build_test_app(pool.clone()), "/projects/stats").await).await;
    assert_eq!(stats["draft"], 1);
    assert_eq!(stats["published"], 1);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a running PostgreSQL instance"]
async fn health_reports_connected_database(pool: PgPool) {
    let response = get(build_test_app(pool), "/health").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], "connected");
}
