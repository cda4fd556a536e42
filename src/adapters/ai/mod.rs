//! AI adapters - chat completion providers and the structured-output client.

mod classification_client;
mod mock_provider;
mod openai_provider;

pub use classification_client::ClassificationClient;
pub use mock_provider::MockAIProvider;
pub use openai_provider::{OpenAIConfig, OpenAIProvider};
