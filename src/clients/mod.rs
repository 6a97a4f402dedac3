pub mod openai;
pub mod traits;

pub use openai::OpenAiBackend;
pub use traits::{BackendError, CallOptions, GenerationBackend};
