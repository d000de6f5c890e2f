use stitchcraft::api::create_router;
use stitchcraft::client::{ClientError, StitchClient};
use stitchcraft::db::Database;
use stitchcraft::engine::{DecreaseRule, ExportFormat};
use stitchcraft::models::*;
use uuid::Uuid;

/// Serve a fresh in-memory database on an ephemeral port and return a
/// client for it along with a profile to own patterns.
async fn spawn_server() -> (StitchClient, Profile) {
    let db = Database::open_memory().expect("Failed to create database");
    db.migrate().expect("Failed to migrate");
    let profile = db
        .create_profile(CreateProfileInput {
            email: "client@example.com".to_string(),
            display_name: None,
        })
        .expect("Failed to create profile");

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().expect("No local address");
    let app = create_router(db);
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Server failed");
    });

    (
        StitchClient::new(format!("http://{}/api/v1/", addr), None),
        profile,
    )
}

fn decrease_pattern(owner_id: Uuid) -> CreatePatternInput {
    CreatePatternInput {
        owner_id,
        name: "Closing Rounds".to_string(),
        description: String::new(),
        difficulty: Difficulty::Beginner,
        hook_size: String::new(),
        yarn_weight: String::new(),
        gauge: None,
        materials: vec![],
        sections: vec![Section::new(
            "Finish",
            vec![Round::new(vec![Stitch::new(StitchKind::Decrease, 6)])],
        )],
        notes: vec![],
    }
}

#[tokio::test]
async fn creates_lists_and_fetches_patterns() {
    let (client, profile) = spawn_server().await;
    client.health().await.expect("Health check failed");

    let created = client
        .create_pattern(&decrease_pattern(profile.id))
        .await
        .expect("Create failed");

    let listed = client
        .list_patterns(Some(profile.id))
        .await
        .expect("List failed");
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, created.id);

    let fetched = client.get_pattern(created.id).await.expect("Get failed");
    assert_eq!(fetched, created);
}

#[tokio::test]
async fn export_honours_the_requested_rule() {
    let (client, profile) = spawn_server().await;
    let pattern = client
        .create_pattern(&decrease_pattern(profile.id))
        .await
        .expect("Create failed");

    let subtract = client
        .export_pattern(pattern.id, ExportFormat::Text, None)
        .await
        .expect("Export failed");
    assert!(subtract.contains("Rnd 1: dec 6 (12 sts) (-6 sts)"));

    let ceil = client
        .export_pattern(pattern.id, ExportFormat::Markdown, Some(DecreaseRule::CeilHalf))
        .await
        .expect("Export failed");
    assert!(ceil.contains("- **Rnd 1:** dec 6 (12 sts) (3 sts)"));
}

#[tokio::test]
async fn missing_pattern_is_not_found() {
    let (client, _) = spawn_server().await;
    let result = client.get_pattern(Uuid::new_v4()).await;

    assert!(matches!(result, Err(ClientError::NotFound(msg)) if msg == "Pattern not found"));
}

#[tokio::test]
async fn invalid_pattern_is_bad_request() {
    let (client, _) = spawn_server().await;
    let result = client.create_pattern(&decrease_pattern(Uuid::new_v4())).await;

    assert!(matches!(result, Err(ClientError::BadRequest(_))));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn parallel_stitch_deletes_all_stick() {
    let (client, profile) = spawn_server().await;
    let mut input = decrease_pattern(profile.id);
    input.sections[0].rounds[0] = Round::new(
        (0..40)
            .map(|_| Stitch::new(StitchKind::SingleCrochet, 1))
            .collect(),
    );
    let pattern = client.create_pattern(&input).await.expect("Create failed");

    let deletes: Vec<_> = pattern.sections[0].rounds[0]
        .stitches
        .iter()
        .map(|stitch| {
            let client = client.clone();
            let (pattern_id, stitch_id) = (pattern.id, stitch.id);
            tokio::spawn(async move { client.delete_stitch(pattern_id, stitch_id).await })
        })
        .collect();
    for delete in deletes {
        delete
            .await
            .expect("Delete task panicked")
            .expect("Delete failed");
    }

    let saved = client.get_pattern(pattern.id).await.expect("Get failed");
    assert!(saved.sections[0].rounds[0].stitches.is_empty());
}

#[tokio::test]
async fn deleting_a_stitch_twice_is_not_found() {
    let (client, profile) = spawn_server().await;
    let pattern = client
        .create_pattern(&decrease_pattern(profile.id))
        .await
        .expect("Create failed");
    let stitch_id = pattern.sections[0].rounds[0].stitches[0].id;

    let saved = client
        .delete_stitch(pattern.id, stitch_id)
        .await
        .expect("Delete failed");
    assert!(saved.sections[0].rounds[0].stitches.is_empty());

    let again = client.delete_stitch(pattern.id, stitch_id).await;
    assert!(matches!(again, Err(ClientError::NotFound(_))));
}
