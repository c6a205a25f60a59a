//! Integration tests for the catalog indexing and answering pipeline.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use voicecart::connector::{MockChatClient, StaticCatalogSource};
use voicecart::domain::RetrievalResult;
use voicecart::{
    AnswerQuestionUseCase, CatalogRecord, ClearIndexUseCase, Document, DomainError,
    EmbeddingConfig, EmbeddingService, InMemoryVectorRepository, JsonCatalogSource, MockEmbedding,
    PopulateIndexUseCase, RetrievalMode, RetrievalQuery, RetrieveContextUseCase, VectorRepository,
};

/// Embedding keyed on the first listed word a text contains.
struct TableEmbedding {
    config: EmbeddingConfig,
    table: Vec<(&'static str, Vec<f32>)>,
}

impl TableEmbedding {
    fn new() -> Self {
        let q = (1.0_f32 - 0.95 * 0.95).sqrt();
        Self {
            config: EmbeddingConfig::new("table", 2),
            table: vec![
                ("please", vec![0.95, q]),
                ("socks", vec![0.0, -1.0]),
                ("widget", vec![1.0, 0.0]),
                ("gadget", vec![0.5, 0.866_025_4]),
            ],
        }
    }
}

#[async_trait]
impl EmbeddingService for TableEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, DomainError> {
        let text = text.to_lowercase();
        self.table
            .iter()
            .find(|(word, _)| text.contains(word))
            .map(|(_, vector)| vector.clone())
            .ok_or_else(|| DomainError::embedding(format!("no vector for {:?}", text)))
    }

    fn config(&self) -> &EmbeddingConfig {
        &self.config
    }
}

/// Store whose disk has gone away.
struct UnavailableRepository;

#[async_trait]
impl VectorRepository for UnavailableRepository {
    async fn upsert_all(&self, _documents: &[Document]) -> Result<(), DomainError> {
        Err(DomainError::storage("disk gone"))
    }

    async fn clear(&self) -> Result<(), DomainError> {
        Err(DomainError::storage("disk gone"))
    }

    async fn search(
        &self,
        _query_embedding: &[f32],
        _query: &RetrievalQuery,
    ) -> Result<RetrievalResult, DomainError> {
        Err(DomainError::storage("disk gone"))
    }

    async fn list_all(&self) -> Result<Vec<Document>, DomainError> {
        Err(DomainError::storage("disk gone"))
    }

    async fn count(&self) -> Result<u64, DomainError> {
        Err(DomainError::storage("disk gone"))
    }
}

fn sample_records() -> Vec<CatalogRecord> {
    vec![
        CatalogRecord::new("Widget", 10.0)
            .with_id("w-1")
            .in_stock(true),
        CatalogRecord::new("Gadget", 25.0)
            .with_id("g-1")
            .with_category("tools"),
    ]
}

struct TestEnv {
    repo: Arc<InMemoryVectorRepository>,
    embedding: Arc<TableEmbedding>,
}

async fn populated_env() -> TestEnv {
    let repo = Arc::new(InMemoryVectorRepository::new());
    let embedding = Arc::new(TableEmbedding::new());

    let use_case = PopulateIndexUseCase::new(
        Arc::new(StaticCatalogSource::new(sample_records())),
        repo.clone(),
        embedding.clone(),
    );
    use_case.execute(false).await.expect("Failed to populate");

    TestEnv { repo, embedding }
}

#[tokio::test]
async fn test_populate_stores_one_document_per_record() {
    let env = populated_env().await;

    assert_eq!(env.repo.count().await.unwrap(), 2);

    let documents = env.repo.list_all().await.unwrap();
    assert!(documents[0].content().starts_with("Product: Widget"));
    assert!(documents[1].content().starts_with("Product: Gadget"));
    assert_eq!(documents[0].dimensions(), 2);
}

#[tokio::test]
async fn test_search_applies_threshold() {
    let env = populated_env().await;
    let retriever = RetrieveContextUseCase::new(env.repo.clone(), env.embedding.clone());

    let results = retriever
        .search("widget please", &RetrievalQuery::default())
        .await
        .expect("Failed to search");

    assert_eq!(results.len(), 1, "Gadget scores below 0.78");
    assert!(results[0].document().content().starts_with("Product: Widget"));
    assert!((results[0].similarity() - 0.95).abs() < 1e-4);

    let loose = retriever
        .search("widget please", &RetrievalQuery::new().with_threshold(0.5))
        .await
        .unwrap();
    assert_eq!(loose.len(), 2);
    assert!(loose[0].similarity() >= loose[1].similarity());
}

#[tokio::test]
async fn test_repopulating_replaces_documents() {
    let env = populated_env().await;

    let use_case = PopulateIndexUseCase::new(
        Arc::new(StaticCatalogSource::new(vec![
            CatalogRecord::new("Widget", 12.0).with_id("w-1")
        ])),
        env.repo.clone(),
        env.embedding.clone(),
    );
    use_case.execute(false).await.unwrap();

    let documents = env.repo.list_all().await.unwrap();
    assert_eq!(documents.len(), 2);
    assert!(documents[0].content().contains("Price: $12"));
}

#[tokio::test]
async fn test_fresh_population_clears_first() {
    let env = populated_env().await;

    let use_case = PopulateIndexUseCase::new(
        Arc::new(StaticCatalogSource::new(vec![
            CatalogRecord::new("Gadget", 25.0).with_id("g-1")
        ])),
        env.repo.clone(),
        env.embedding.clone(),
    );
    let report = use_case.execute(true).await.unwrap();

    assert_eq!(report.documents, 1);
    assert_eq!(report.dimensions, 2);
    assert_eq!(env.repo.count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_records_without_id_sharing_a_name_are_both_stored() {
    let repo = Arc::new(InMemoryVectorRepository::new());
    let records = vec![
        CatalogRecord::new("Widget", 10.0).with_description("red"),
        CatalogRecord::new("Widget", 12.0).with_description("blue"),
    ];

    let use_case = PopulateIndexUseCase::new(
        Arc::new(StaticCatalogSource::new(records)),
        repo.clone(),
        Arc::new(TableEmbedding::new()),
    );
    let report = use_case.execute(false).await.unwrap();

    assert_eq!(report.documents, 2);
    assert_eq!(repo.count().await.unwrap(), 2);

    let documents = repo.list_all().await.unwrap();
    assert!(documents[0].content().contains("Description: red"));
    assert!(documents[1].content().contains("Description: blue"));

    // Rerunning the same catalog replaces rather than duplicates.
    use_case.execute(false).await.unwrap();
    assert_eq!(repo.count().await.unwrap(), 2);
}

#[tokio::test]
async fn test_ingestion_failure_names_the_record() {
    let repo = Arc::new(InMemoryVectorRepository::new());
    let mut records = sample_records();
    records.push(CatalogRecord::new("Mystery", 1.0).with_id("m-1"));

    let use_case = PopulateIndexUseCase::new(
        Arc::new(StaticCatalogSource::new(records)),
        repo.clone(),
        Arc::new(TableEmbedding::new()),
    );
    let err = use_case.execute(false).await.unwrap_err();

    match err {
        DomainError::Ingestion { record, .. } => assert_eq!(record, "m-1"),
        other => panic!("unexpected error: {}", other),
    }
    assert_eq!(
        repo.count().await.unwrap(),
        2,
        "Records before the failure stay stored"
    );
}

#[tokio::test]
async fn test_full_corpus_mode_uses_every_document() {
    let env = populated_env().await;
    let retriever = RetrieveContextUseCase::new(env.repo.clone(), env.embedding.clone())
        .with_mode(RetrievalMode::FullCorpus);

    let context = retriever.retrieve("anything at all").await.unwrap();

    assert_eq!(context.documents, 2);
    let widget = context.text.find("Product: Widget").unwrap();
    let gadget = context.text.find("Product: Gadget").unwrap();
    assert!(widget < gadget);
}

#[tokio::test]
async fn test_full_corpus_failure_aborts_with_retrieval_error() {
    let retriever = RetrieveContextUseCase::new(
        Arc::new(UnavailableRepository),
        Arc::new(TableEmbedding::new()),
    )
    .with_mode(RetrievalMode::FullCorpus);

    let err = retriever.retrieve("widget please").await.unwrap_err();

    match err {
        DomainError::Retrieval(message) => assert!(message.contains("disk gone")),
        other => panic!("unexpected error: {}", other),
    }
}

#[tokio::test]
async fn test_retrieval_failure_degrades_to_empty_context() {
    let env = populated_env().await;
    let retriever = RetrieveContextUseCase::new(env.repo.clone(), env.embedding.clone());

    let context = retriever.retrieve("unknown words").await.unwrap();

    assert!(context.is_empty());
    assert!(context.degraded);
}

#[tokio::test]
async fn test_answer_is_grounded_in_retrieved_products() {
    let env = populated_env().await;
    let chat = Arc::new(MockChatClient::new());
    let retriever = Arc::new(RetrieveContextUseCase::new(
        env.repo.clone(),
        env.embedding.clone(),
    ));
    let use_case = AnswerQuestionUseCase::new(retriever, chat.clone());

    let answer = use_case.answer("widget please", &[]).await.unwrap();

    assert!(answer.grounded);
    assert_eq!(answer.context_documents, 1);
    assert!(answer.text.contains("Widget"));

    let calls = chat.calls();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].system.contains("Product: Widget"));
    assert!(!calls[0].system.contains("Product: Gadget"));
    assert_eq!(calls[0].messages.last().unwrap().content, "widget please");
}

#[tokio::test]
async fn test_answer_without_matches_admits_it() {
    let env = populated_env().await;
    let chat = Arc::new(MockChatClient::new());
    let retriever = Arc::new(RetrieveContextUseCase::new(
        env.repo.clone(),
        env.embedding.clone(),
    ));
    let use_case = AnswerQuestionUseCase::new(retriever, chat.clone());

    let answer = use_case.answer("any socks?", &[]).await.unwrap();

    assert!(!answer.grounded);
    assert!(answer.text.starts_with("I don't have enough product information"));
    assert!(chat.calls()[0]
        .system
        .contains("No product information is available"));
}

#[tokio::test]
async fn test_generation_failure_propagates() {
    let env = populated_env().await;
    let retriever = Arc::new(RetrieveContextUseCase::new(
        env.repo.clone(),
        env.embedding.clone(),
    ));
    let use_case =
        AnswerQuestionUseCase::new(retriever, Arc::new(MockChatClient::failing("quota")));

    let err = use_case.answer("widget please", &[]).await.unwrap_err();
    assert!(matches!(err, DomainError::Generation(_)));
}

#[tokio::test]
async fn test_clear_empties_the_index() {
    let env = populated_env().await;

    ClearIndexUseCase::new(env.repo.clone())
        .execute()
        .await
        .expect("Failed to clear");

    assert_eq!(env.repo.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_sample_catalog_populates_and_searches() {
    let catalog = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data/products.json");
    let repo = Arc::new(InMemoryVectorRepository::new());
    let embedding = Arc::new(MockEmbedding::with_dimensions(1024));

    let report = PopulateIndexUseCase::new(
        Arc::new(JsonCatalogSource::new(&catalog)),
        repo.clone(),
        embedding.clone(),
    )
    .execute(true)
    .await
    .expect("Failed to populate sample catalog");
    assert_eq!(report.documents, 8);

    let retriever = RetrieveContextUseCase::new(repo, embedding);
    let results = retriever
        .search(
            "PlayStation console",
            &RetrievalQuery::new().with_k(3).with_threshold(0.0),
        )
        .await
        .unwrap();

    assert_eq!(results.len(), 3);
    assert_eq!(results[0].document().title(), "PlayStation 5 Console");
}
