use anyhow::Result;
use fastembed::{
    read_file_to_bytes, EmbeddingModel, InitOptions, InitOptionsUserDefined, Pooling,
    TextEmbedding, TokenizerFiles, UserDefinedEmbeddingModel,
};
use std::path::Path;

/// Loads all-MiniLM-L6-v2 from `model_dir` when given (an exported
/// sentence-transformers directory), otherwise from the fastembed model cache,
/// downloading it on first use.
pub fn get_model(model_dir: Option<&Path>) -> Result<TextEmbedding> {
    match model_dir {
        Some(base_path) => load_user_defined(base_path),
        None => Ok(TextEmbedding::try_new(
            InitOptions::new(EmbeddingModel::AllMiniLML6V2).with_show_download_progress(true),
        )?),
    }
}

fn load_user_defined(base_path: &Path) -> Result<TextEmbedding> {
    let onnx_path = base_path.join("onnx").join("model.onnx");
    let tokenizer_path = base_path.join("tokenizer.json");
    let config_path = base_path.join("config.json");
    let special_tokens_map_path = base_path.join("special_tokens_map.json");
    let tokenizer_config_path = base_path.join("tokenizer_config.json");

    let onnx_bytes = read_file_to_bytes(&onnx_path)?;
    let tokenizer_files = TokenizerFiles {
        tokenizer_file: read_file_to_bytes(&tokenizer_path)?,
        config_file: read_file_to_bytes(&config_path)?,
        special_tokens_map_file: read_file_to_bytes(&special_tokens_map_path)?,
        tokenizer_config_file: read_file_to_bytes(&tokenizer_config_path)?,
    };

    let user_model =
        UserDefinedEmbeddingModel::new(onnx_bytes, tokenizer_files).with_pooling(Pooling::Mean);

    Ok(TextEmbedding::try_new_from_user_defined(
        user_model,
        InitOptionsUserDefined::default(),
    )?)
}
