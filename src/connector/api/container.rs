use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::application::{
    AnswerQuestionUseCase, AudioCapture, AudioPlayer, CallTimeouts, ChatClient,
    ClearIndexUseCase, ConversationServices, EmbeddingService, PopulateIndexUseCase,
    RetrieveContextUseCase, Synthesizer, Transcriber, VectorRepository,
};
use crate::connector::adapter::{
    AnthropicClient, DuckdbDocumentRepository, FileAudioCapture, FileAudioPlayer, GeminiClient,
    HttpSynthesizer, HttpTranscriber, InMemoryVectorRepository, JsonCatalogSource,
    MockChatClient, MockEmbedding, MockSynthesizer, MockTranscriber, OpenAiEmbedding,
    SpeechEndpoint, DEFAULT_VOICE,
};
use crate::domain::{
    RetrievalMode, RetrievalQuery, DEFAULT_MATCH_COUNT, DEFAULT_MATCH_THRESHOLD,
};

const DB_FILE: &str = "voicecart.duckdb";

/// Which language model answers questions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GenerationProvider {
    #[default]
    Gemini,
    Anthropic,
}

impl GenerationProvider {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "anthropic" | "claude" => GenerationProvider::Anthropic,
            _ => GenerationProvider::Gemini,
        }
    }
}

pub struct ContainerConfig {
    pub data_dir: String,
    /// Offline embeddings, chat and speech.
    pub mock_services: bool,
    pub memory_storage: bool,
    pub use_rag: bool,
    pub match_threshold: f32,
    pub match_count: usize,
    pub generation_provider: GenerationProvider,
    pub tts_voice: String,
    pub call_timeout: Duration,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            data_dir: "~/.voicecart".to_string(),
            mock_services: false,
            memory_storage: false,
            use_rag: true,
            match_threshold: DEFAULT_MATCH_THRESHOLD,
            match_count: DEFAULT_MATCH_COUNT,
            generation_provider: GenerationProvider::default(),
            tts_voice: DEFAULT_VOICE.to_string(),
            call_timeout: Duration::from_secs(30),
        }
    }
}

impl ContainerConfig {
    /// | Variable              | Default  |
    /// |-----------------------|----------|
    /// | `USE_RAG`             | `true`   |
    /// | `MATCH_THRESHOLD`     | `0.78`   |
    /// | `MATCH_COUNT`         | `5`      |
    /// | `GENERATION_PROVIDER` | `gemini` |
    /// | `TTS_VOICE`           | `alloy`  |
    /// | `CALL_TIMEOUT_SECS`   | `30`     |
    ///
    /// Unparseable values fall back to the default with a warning.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            use_rag: env_parsed("USE_RAG", defaults.use_rag),
            match_threshold: env_parsed("MATCH_THRESHOLD", defaults.match_threshold),
            match_count: env_parsed("MATCH_COUNT", defaults.match_count),
            generation_provider: std::env::var("GENERATION_PROVIDER")
                .map(|p| GenerationProvider::parse(&p))
                .unwrap_or_default(),
            tts_voice: std::env::var("TTS_VOICE").unwrap_or(defaults.tts_voice),
            call_timeout: Duration::from_secs(env_parsed(
                "CALL_TIMEOUT_SECS",
                defaults.call_timeout.as_secs(),
            )),
            ..defaults
        }
    }

    pub fn retrieval_mode(&self) -> RetrievalMode {
        if self.use_rag {
            RetrievalMode::Rag(
                RetrievalQuery::new()
                    .with_k(self.match_count)
                    .with_threshold(self.match_threshold),
            )
        } else {
            RetrievalMode::FullCorpus
        }
    }
}

fn env_parsed<T: std::str::FromStr>(name: &str, default: T) -> T {
    match std::env::var(name) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("Ignoring invalid {}={:?}", name, raw);
            default
        }),
        Err(_) => default,
    }
}

/// Wires adapters into use cases.
///
/// Storage is opened eagerly; credentialed clients (embeddings, generation,
/// speech) are built on demand so commands that never call them need no keys.
pub struct Container {
    vector_repo: Arc<dyn VectorRepository>,
    embedding_service: Option<Arc<dyn EmbeddingService>>,
    config: ContainerConfig,
}

impl Container {
    pub async fn new(config: ContainerConfig) -> Result<Self> {
        let vector_repo: Arc<dyn VectorRepository> = if config.memory_storage {
            debug!("Using in-memory document storage");
            Arc::new(InMemoryVectorRepository::new())
        } else {
            let data_dir = expand_tilde(&config.data_dir);
            std::fs::create_dir_all(&data_dir)
                .with_context(|| format!("Failed to create data dir {}", data_dir))?;
            let db_path = PathBuf::from(&data_dir).join(DB_FILE);

            match DuckdbDocumentRepository::new(&db_path) {
                Ok(duckdb) => {
                    debug!("Using DuckDB document storage at {:?}", db_path);
                    Arc::new(duckdb)
                }
                Err(e) => {
                    warn!(
                        "Failed to initialize DuckDB ({}): {}. Falling back to in-memory storage.",
                        db_path.display(),
                        e
                    );
                    Arc::new(InMemoryVectorRepository::new())
                }
            }
        };

        let embedding_service: Option<Arc<dyn EmbeddingService>> = if config.mock_services {
            debug!("Using mock embedding service");
            Some(Arc::new(MockEmbedding::new()))
        } else {
            None
        };

        Ok(Self {
            vector_repo,
            embedding_service,
            config,
        })
    }

    /// A container over caller-supplied storage and embeddings, used by tests.
    pub fn with_services(
        config: ContainerConfig,
        vector_repo: Arc<dyn VectorRepository>,
        embedding_service: Arc<dyn EmbeddingService>,
    ) -> Self {
        Self {
            vector_repo,
            embedding_service: Some(embedding_service),
            config,
        }
    }

    pub fn timeouts(&self) -> CallTimeouts {
        CallTimeouts::uniform(self.config.call_timeout)
    }

    pub fn embedding_service(&self) -> Result<Arc<dyn EmbeddingService>> {
        if let Some(service) = &self.embedding_service {
            return Ok(Arc::clone(service));
        }
        debug!("Initializing OpenAI embedding service...");
        let service = OpenAiEmbedding::from_env(self.config.call_timeout)?;
        Ok(Arc::new(service))
    }

    pub fn chat_client(&self) -> Result<Arc<dyn ChatClient>> {
        if self.config.mock_services {
            return Ok(Arc::new(MockChatClient::new()));
        }
        let client: Arc<dyn ChatClient> = match self.config.generation_provider {
            GenerationProvider::Gemini => {
                Arc::new(GeminiClient::from_env(self.config.call_timeout)?)
            }
            GenerationProvider::Anthropic => {
                Arc::new(AnthropicClient::from_env(self.config.call_timeout)?)
            }
        };
        debug!("Using {} for generation", client.model_name());
        Ok(client)
    }

    pub fn transcriber(&self) -> Result<Arc<dyn Transcriber>> {
        if self.config.mock_services {
            return Ok(Arc::new(MockTranscriber::echo()));
        }
        let endpoint = SpeechEndpoint::from_env(self.config.call_timeout)?;
        Ok(Arc::new(HttpTranscriber::new(endpoint)))
    }

    pub fn synthesizer(&self) -> Result<Arc<dyn Synthesizer>> {
        self.synthesizer_with_voice(None)
    }

    /// `voice` overrides the configured `TTS_VOICE`.
    pub fn synthesizer_with_voice(&self, voice: Option<&str>) -> Result<Arc<dyn Synthesizer>> {
        if self.config.mock_services {
            return Ok(Arc::new(MockSynthesizer::new()));
        }
        let voice = voice
            .filter(|v| !v.trim().is_empty())
            .unwrap_or(self.config.tts_voice.as_str());
        let endpoint = SpeechEndpoint::from_env(self.config.call_timeout)?;
        Ok(Arc::new(HttpSynthesizer::new(endpoint, voice)))
    }

    pub fn populate_use_case(&self, catalog: &Path, show_progress: bool) -> Result<PopulateIndexUseCase> {
        Ok(PopulateIndexUseCase::new(
            Arc::new(JsonCatalogSource::new(catalog)),
            self.vector_repo.clone(),
            self.embedding_service()?,
        )
        .with_timeouts(self.timeouts())
        .with_progress(show_progress))
    }

    pub fn clear_use_case(&self) -> ClearIndexUseCase {
        ClearIndexUseCase::new(self.vector_repo.clone())
    }

    pub fn retrieve_use_case(&self) -> Result<RetrieveContextUseCase> {
        Ok(
            RetrieveContextUseCase::new(self.vector_repo.clone(), self.embedding_service()?)
                .with_mode(self.config.retrieval_mode())
                .with_timeouts(self.timeouts()),
        )
    }

    pub fn answer_use_case(&self) -> Result<AnswerQuestionUseCase> {
        Ok(AnswerQuestionUseCase::new(
            Arc::new(self.retrieve_use_case()?),
            self.chat_client()?,
        )
        .with_timeouts(self.timeouts()))
    }

    /// Devices and services for a voice session reading from `audio_in` and
    /// writing responses into `audio_out`.
    pub fn conversation_services(
        &self,
        audio_in: &Path,
        audio_out: &Path,
    ) -> Result<ConversationServices> {
        let capture: Arc<dyn AudioCapture> = Arc::new(FileAudioCapture::new(audio_in));
        let player: Arc<dyn AudioPlayer> = Arc::new(FileAudioPlayer::new(audio_out));

        Ok(ConversationServices {
            capture,
            transcriber: self.transcriber()?,
            answerer: Arc::new(self.answer_use_case()?),
            synthesizer: self.synthesizer()?,
            player,
            timeouts: self.timeouts(),
        })
    }

    pub fn vector_repo(&self) -> Arc<dyn VectorRepository> {
        self.vector_repo.clone()
    }

    pub fn retrieval_mode(&self) -> RetrievalMode {
        self.config.retrieval_mode()
    }

    pub fn data_dir(&self) -> &str {
        &self.config.data_dir
    }

    pub fn memory_storage(&self) -> bool {
        self.config.memory_storage
    }

    pub fn mock_services(&self) -> bool {
        self.config.mock_services
    }
}

pub fn expand_tilde(path: &str) -> String {
    if path == "~" || path.starts_with("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            if path == "~" {
                return home.to_string_lossy().to_string();
            }
            return path.replacen('~', &home.to_string_lossy(), 1);
        }
    }
    path.to_string()
}
