pub mod clients;
pub mod compactor;
pub mod config;
pub mod contracts;
pub mod deserializers;
pub mod engine;
pub mod error;
pub mod normalizer;
pub mod orchestrate;
pub mod prompts;
pub mod rag;
pub mod rounds;
pub mod schemas;
pub mod synthesis;
pub mod utils;
pub mod validators;

pub use contracts::{DocKind, DocText, Finals, Problem, Triple};
pub use error::{ChiralityError, Result};
pub use orchestrate::Orchestrator;

// Load env from CHIR_ENV_FILE if set, otherwise ./.env if present.
// Missing files are silently ignored.
pub fn load_env() {
    if let Ok(env_path) = std::env::var("CHIR_ENV_FILE") {
        let _ = dotenvy::from_path(env_path);
    } else {
        let _ = dotenvy::dotenv();
    }
}
