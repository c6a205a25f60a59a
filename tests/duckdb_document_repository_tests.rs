use tempfile::tempdir;
use voicecart::domain::build_document;
use voicecart::{CatalogRecord, Document, DuckdbDocumentRepository, RetrievalQuery, VectorRepository};

fn unit_vector(dim: usize, hot_index: usize) -> Vec<f32> {
    let mut v = vec![0.0; dim];
    v[hot_index] = 1.0;
    v
}

fn product(id: &str, name: &str, price: f64, hot_index: usize) -> Document {
    let record = CatalogRecord::new(name, price).with_id(id);
    build_document(&record).with_embedding(unit_vector(8, hot_index))
}

#[tokio::test]
async fn duckdb_document_repository_can_save_and_search() {
    let dir = tempdir().expect("tempdir");
    let repo = DuckdbDocumentRepository::new(&dir.path().join("documents.duckdb"))
        .expect("duckdb init");

    repo.upsert_all(&[product("1", "Camera", 3899.0, 0), product("2", "Console", 499.0, 1)])
        .await
        .expect("upsert");

    let results = repo
        .search(&unit_vector(8, 1), &RetrievalQuery::default())
        .await
        .expect("search");

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].document().title(), "Console");
    assert!((results[0].similarity() - 1.0).abs() < 1e-6);
    assert_eq!(results[0].document().metadata()["productId"], "2");
}

#[tokio::test]
async fn duckdb_document_repository_persists_across_reopen() {
    let dir = tempdir().expect("tempdir");
    let db_path = dir.path().join("documents.duckdb");

    {
        let repo = DuckdbDocumentRepository::new(&db_path).expect("duckdb init");
        repo.upsert_all(&[product("1", "Camera", 3899.0, 0), product("2", "Console", 499.0, 1)])
            .await
            .expect("upsert");
    }

    let reopened = DuckdbDocumentRepository::new(&db_path).expect("duckdb reopen");
    assert_eq!(reopened.count().await.unwrap(), 2);

    let documents = reopened.list_all().await.unwrap();
    assert_eq!(documents[0].title(), "Camera");
    assert_eq!(documents[0].embedding(), unit_vector(8, 0).as_slice());
}

#[tokio::test]
async fn duckdb_document_repository_replace_keeps_position() {
    let repo = DuckdbDocumentRepository::in_memory().expect("duckdb init");

    repo.upsert_all(&[
        product("1", "Camera", 3899.0, 0),
        product("2", "Console", 499.0, 1),
        product("3", "Drone", 759.0, 2),
    ])
    .await
    .unwrap();
    repo.upsert_all(&[product("1", "Camera", 3499.0, 3)])
        .await
        .unwrap();

    let documents = repo.list_all().await.unwrap();
    let titles: Vec<&str> = documents.iter().map(Document::title).collect();
    assert_eq!(titles, vec!["Camera", "Console", "Drone"]);
    assert!(documents[0].content().contains("Price: $3499"));
    assert_eq!(documents[0].embedding(), unit_vector(8, 3).as_slice());
}

#[tokio::test]
async fn duckdb_document_repository_rejects_dimension_mismatch() {
    let repo = DuckdbDocumentRepository::in_memory().expect("duckdb init");
    repo.upsert_all(&[product("1", "Camera", 3899.0, 0)])
        .await
        .unwrap();

    let short = build_document(&CatalogRecord::new("Mouse", 79.0).with_id("8"))
        .with_embedding(vec![1.0, 0.0]);
    let err = repo.upsert_all(&[short]).await.unwrap_err();

    assert!(err.to_string().contains("dimension"));
    assert_eq!(repo.count().await.unwrap(), 1);
}

#[tokio::test]
async fn duckdb_document_repository_clear_removes_everything() {
    let repo = DuckdbDocumentRepository::in_memory().expect("duckdb init");
    repo.upsert_all(&[product("1", "Camera", 3899.0, 0)])
        .await
        .unwrap();

    repo.clear().await.unwrap();
    assert_eq!(repo.count().await.unwrap(), 0);

    // A cleared store accepts a new dimension.
    let fresh = build_document(&CatalogRecord::new("Mouse", 79.0).with_id("8"))
        .with_embedding(vec![0.0, 1.0]);
    repo.upsert_all(&[fresh]).await.unwrap();

    let results = repo
        .search(&[0.0, 1.0], &RetrievalQuery::default())
        .await
        .unwrap();
    assert_eq!(results.len(), 1);
}
