pub mod application;
pub mod cli;
pub mod connector;
pub mod domain;

pub use cli::Commands;

pub use application::{
    AnswerQuestionUseCase, AudioCapture, AudioPlayer, CatalogSource, ChatClient,
    ClearIndexUseCase, ConversationActor, ConversationEvent, ConversationHandle,
    ConversationServices, ConversationSession, EmbeddingService, PopulateIndexUseCase,
    RetrieveContextUseCase, SessionSnapshot, Synthesizer, Transcriber, VectorRepository,
};

pub use connector::{
    serve, Container, ContainerConfig, DuckdbDocumentRepository, InMemoryVectorRepository,
    JsonCatalogSource, MockEmbedding, Router,
};

pub use domain::{
    CatalogRecord, ConversationState, ConversationTurn, Document, DomainError, EmbeddingConfig,
    RetrievalMode, RetrievalQuery, Role, ScoredDocument,
};
