pub mod embedder;
pub mod generate;
pub mod hashing;
pub mod persist;
pub mod preprocess;
pub mod similarity;

pub use embedder::{cosine_similarity, Embedder};
pub use generate::{generate_embeddings, EmbeddingGenerationConfig, EmbeddingGenerationReport};
pub use hashing::HashingEmbedder;
pub use persist::{EmbeddingMetadata, KeyMeta};
pub use preprocess::preprocess_for_embedding;
pub use similarity::similarity_between_keys;
