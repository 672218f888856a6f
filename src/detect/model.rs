use std::path::Path;

use ort::session::{builder::GraphOptimizationLevel, Session};

use crate::Result;

/// 加载YOLO模型
///
/// 加载ONNX格式的YOLO模型，并应用优化配置。
///
/// # 参数
/// * `model_path` - 模型文件路径
/// * `intra_threads` - 算子内并行线程数
///
/// # 错误处理
/// 如果模型加载失败会返回Err
pub fn load_model(model_path: &Path, intra_threads: usize) -> Result<Session> {
    let model = Session::builder()?
        .with_optimization_level(GraphOptimizationLevel::Level3)?
        .with_intra_threads(intra_threads)?
        .commit_from_file(model_path)?;
    tracing::info!(path = %model_path.display(), "model loaded");
    Ok(model)
}
