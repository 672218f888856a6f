//! Detect模块 - 基于YOLO的目标检测与按类别筛选
//!
//! 该模块提供：
//! - 模型加载（ONNX Runtime）
//! - 图像预处理
//! - 模型推理
//! - 结果后处理（置信度过滤、按类别NMS）
//! - 检测结果缓存策略
//! - 按类别筛选
//!
//! # 工作流程
//!
//! 1. 使用 `load_model` 加载ONNX模型，`load_image` 加载待检测图像
//! 2. 创建 `YoloDetector` 并交给 `DetectionProvider`
//! 3. `DetectionProvider::detections` 按策略返回（可能已缓存的）`DetectionSet`
//! 4. `filter` 取出目标类别的检测结果

pub mod bounds;
pub mod detector;
pub mod filter;
pub mod infer;
pub mod model;
pub mod posts;
pub mod prevs;
pub mod provider;

pub use bounds::{BoundingBox, Detection, DetectionSet};
pub use detector::{Inference, YoloDetector};
pub use filter::{FilteredDetections, filter};
pub use model::load_model;
pub use prevs::{image_to_tensor, load_image, resize_image};
pub use provider::{DetectionPolicy, DetectionProvider};
