//! Process configuration
//!
//! Credentials and endpoint settings are resolved once at startup and passed
//! by reference into provider constructors; nothing in the pipeline reads the
//! environment after that.

/// Pipeline configuration resolved from the process environment.
///
/// The embedding credential and vector-store pair are optional: their absence
/// disables retrieval (summaries are still produced, ungrounded). The
/// generation credential is also allowed to be absent here, but any
/// generation attempt without it fails with `ConfigurationMissing`.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Google AI API key, used for both embedding and generation calls.
    pub google_api_key: Option<String>,
    /// Supabase project URL hosting the pgvector corpus.
    pub supabase_url: Option<String>,
    /// Supabase service-role key for the similarity RPC.
    pub supabase_service_key: Option<String>,
    /// Generation model ID.
    pub generation_model: String,
    /// Embedding model ID.
    pub embedding_model: String,
    /// Base URL of the Google generative language API.
    pub api_base_url: String,
}

pub const DEFAULT_GENERATION_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-004";
pub const DEFAULT_API_BASE_URL: &str = "https://generativelanguage.googleapis.com";

impl Config {
    /// Resolve configuration from environment variables.
    ///
    /// `GOOGLE_API_KEY` is the primary credential name;
    /// `GOOGLE_GENERATIVE_AI_API_KEY` is accepted as a fallback.
    pub fn from_env() -> Self {
        Self {
            google_api_key: env_trimmed("GOOGLE_API_KEY")
                .or_else(|| env_trimmed("GOOGLE_GENERATIVE_AI_API_KEY")),
            supabase_url: env_trimmed("SUPABASE_URL"),
            supabase_service_key: env_trimmed("SUPABASE_SERVICE_ROLE_KEY"),
            generation_model: env_trimmed("BRIDGE_GENERATION_MODEL")
                .unwrap_or_else(|| DEFAULT_GENERATION_MODEL.to_string()),
            embedding_model: env_trimmed("BRIDGE_EMBEDDING_MODEL")
                .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
            api_base_url: env_trimmed("BRIDGE_API_BASE_URL")
                .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string()),
        }
    }

    /// Whether the embedding endpoint can be called at all.
    pub fn embedding_configured(&self) -> bool {
        self.google_api_key.is_some()
    }

    /// Whether the vector store can be queried.
    pub fn store_configured(&self) -> bool {
        self.supabase_url.is_some() && self.supabase_service_key.is_some()
    }
}

fn env_trimmed(name: &str) -> Option<String> {
    match std::env::var(name) {
        Ok(value) => {
            let value = value.trim().to_string();
            if value.is_empty() {
                None
            } else {
                Some(value)
            }
        }
        Err(_) => None,
    }
}
