//! End-to-end tests: the editor submit flow against a real server.

pub mod utils;

use crate::auth::session::create_session_token;
use crate::client::{CatalogClient, ClientError, ListingEditor, ListingForm, Session, SubmitError, SubmitOptions};
use crate::domain::{Category, LocalImage, parser};
use crate::Application;
use rust_decimal::Decimal;
use sqlx::PgPool;
use tempfile::TempDir;
use tokio::net::TcpListener;
use url::Url;
use utils::{create_test_config, test_user};

/// Serve the full application on an ephemeral port
async fn spawn_app(pool: PgPool) -> (Url, TempDir) {
    let uploads = tempfile::tempdir().expect("Failed to create upload dir");
    let mut config = create_test_config();
    config.uploads.dir = uploads.path().to_path_buf();

    let app = Application::new_with_pool(config, Some(pool))
        .await
        .expect("Failed to create application");

    let listener = TcpListener::bind("127.0.0.1:0").await.expect("Failed to bind");
    let addr = listener.local_addr().expect("Listener has an address");
    tokio::spawn(async move {
        axum::serve(listener, app.router.into_make_service())
            .await
            .expect("Server failed");
    });

    (format!("http://{addr}").parse().expect("Valid URL"), uploads)
}

fn session() -> Session {
    let token = create_session_token(&test_user(), &create_test_config()).expect("Failed to create token");
    Session::from_token(token).expect("Token is readable")
}

fn stored_file(uploads: &TempDir, path: &str) -> std::path::PathBuf {
    uploads.path().join(path.strip_prefix("/uploads/").expect("Path under /uploads"))
}

fn files_in(uploads: &TempDir) -> usize {
    std::fs::read_dir(uploads.path()).map(|entries| entries.count()).unwrap_or(0)
}

#[sqlx::test]
#[test_log::test]
async fn test_create_then_edit_through_http(pool: PgPool) {
    let (base_url, uploads) = spawn_app(pool.clone()).await;
    let client = CatalogClient::new(base_url).unwrap();
    let session = session();

    // Draft from free text, then two photos with the second picked as cover
    let form = ListingForm::from(parser::parse("Ford Ranger 2020\n45000 km\nU$S 25000\nNuevo"));
    let mut editor = ListingEditor::new(form);
    editor.images.add_files([
        LocalImage::new("front.jpg", "image/jpeg", b"front".to_vec()),
        LocalImage::new("side.png", "image/png", b"side".to_vec()),
    ]);
    editor.images.move_slot(1, 0).unwrap();

    let created = editor
        .submit(&client, &session, SubmitOptions { require_images: true })
        .await
        .unwrap();

    assert_eq!(created.category, Category::Vehiculo);
    assert_eq!(created.price, Decimal::from(25000));
    assert_eq!(created.images.len(), 2);
    assert!(created.images[0].image_path.starts_with("/uploads/side-"));
    assert!(created.images[0].is_cover);
    assert!(created.images[1].image_path.starts_with("/uploads/front-"));
    for image in &created.images {
        assert!(stored_file(&uploads, &image.image_path).exists());
    }

    // Drop the cover, add a new photo at the end and lower the price
    let mut editor = ListingEditor::edit(&created);
    let cover = editor.images.slots()[0].slot_id;
    editor.images.remove(cover).unwrap();
    editor
        .images
        .add_files([LocalImage::new("rear.webp", "image/webp", b"rear".to_vec())]);
    editor.form.price = Decimal::from(24000);

    let updated = editor.submit(&client, &session, SubmitOptions::default()).await.unwrap();

    assert_eq!(updated.id, created.id);
    assert_eq!(updated.price, Decimal::from(24000));
    assert_eq!(updated.images[0].image_path, created.images[1].image_path);
    assert!(updated.images[0].is_cover);
    assert!(updated.images[1].image_path.starts_with("/uploads/rear-"));
    assert_eq!(updated.images[1].position, 1);

    let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM publication_images WHERE publication_id = $1")
        .bind(created.id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(rows, 2);
}

#[sqlx::test]
#[test_log::test]
async fn test_unchanged_edit_uploads_nothing(pool: PgPool) {
    let (base_url, uploads) = spawn_app(pool).await;
    let client = CatalogClient::new(base_url).unwrap();
    let session = session();

    let form = ListingForm {
        title: "Amoladora".to_string(),
        price: Decimal::from(120),
        currency: None,
        description: String::new(),
        category: Category::Herramienta,
        specs: serde_json::json!({"condicion": "usado"}),
    };
    let mut editor = ListingEditor::new(form);
    editor
        .images
        .add_files([LocalImage::new("a.jpg", "image/jpeg", b"a".to_vec())]);
    let created = editor.submit(&client, &session, SubmitOptions::default()).await.unwrap();
    assert_eq!(files_in(&uploads), 1);

    let editor = ListingEditor::edit(&created);
    assert!(editor.images.is_unchanged());
    let updated = editor.submit(&client, &session, SubmitOptions::default()).await.unwrap();

    assert_eq!(files_in(&uploads), 1);
    let before: Vec<_> = created.images.iter().map(|i| &i.image_path).collect();
    let after: Vec<_> = updated.images.iter().map(|i| &i.image_path).collect();
    assert_eq!(before, after);
}

#[sqlx::test]
#[test_log::test]
async fn test_rejected_upload_persists_nothing(pool: PgPool) {
    let (base_url, uploads) = spawn_app(pool.clone()).await;
    let client = CatalogClient::new(base_url).unwrap();

    let form = ListingForm::from(parser::parse("Tractor John Deere\n1500 hs\n2015"));
    let mut editor = ListingEditor::new(form);
    editor.images.add_files([
        LocalImage::new("ok.jpg", "image/jpeg", b"ok".to_vec()),
        LocalImage::new("manual.pdf", "application/pdf", b"%PDF".to_vec()),
    ]);

    let err = editor
        .submit(&client, &session(), SubmitOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, SubmitError::Client(ClientError::Api { status: 415, .. })), "{err:?}");
    assert_eq!(files_in(&uploads), 0);

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM publications")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 0);
}
