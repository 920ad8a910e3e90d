pub mod all_minilm_l6_v2;
pub mod answer;
pub mod api;
pub mod config;
pub mod document;
pub mod embedding;
pub mod embedding_model_factory;
pub mod pipeline;
pub mod splitter;
pub mod vector_store;
