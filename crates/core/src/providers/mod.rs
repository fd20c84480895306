pub mod openai;

pub use openai::{embedding_dimension, OpenAiClient};
