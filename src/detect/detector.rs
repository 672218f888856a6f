use std::time::Instant;

use image::{DynamicImage, GenericImageView};
use ort::session::Session;

use crate::config::DetectorConfig;
use crate::detect::bounds::DetectionSet;
use crate::detect::infer::run_inference;
use crate::detect::posts::{PostProcess, process_detections};
use crate::detect::prevs::{image_to_tensor, resize_image};
use crate::registry::COCO_CLASSES;
use crate::Result;

/// 检测推理接口
///
/// 一次调用产出整张图像的全部检测结果。
pub trait Inference {
    fn infer(&mut self, image: &DynamicImage) -> Result<DetectionSet>;
}

/// YOLO目标检测器
///
/// 封装了完整的检测流程，包括图像预处理、模型推理和结果后处理。
pub struct YoloDetector {
    /// ONNX模型会话
    model: Session,
    /// 模型输入宽度
    input_width: usize,
    /// 模型输入高度
    input_height: usize,
    /// 置信度阈值，低于此值的检测结果将被过滤
    confidence_threshold: f32,
    /// NMS（非极大值抑制）阈值，用于去除重复检测
    nms_threshold: f32,
    max_detections: usize,
    /// 模型输出的类别数
    num_classes: usize,
}

impl YoloDetector {
    /// 创建新的YoloDetector实例
    pub fn new(model: Session, input_width: usize, input_height: usize) -> Self {
        Self {
            model,
            input_width,
            input_height,
            confidence_threshold: crate::config::DEFAULT_CONFIDENCE_THRESHOLD,
            nms_threshold: crate::config::DEFAULT_NMS_THRESHOLD,
            max_detections: crate::config::DEFAULT_MAX_DETECTIONS,
            num_classes: COCO_CLASSES.len(),
        }
    }

    /// 按配置创建检测器
    pub fn from_config(model: Session, config: &DetectorConfig) -> Self {
        Self::new(model, config.input_width, config.input_height)
            .with_confidence_threshold(config.confidence_threshold)
            .with_nms_threshold(config.nms_threshold)
            .with_max_detections(config.max_detections)
    }

    /// 设置置信度阈值 (0.0 - 1.0)
    pub fn with_confidence_threshold(mut self, threshold: f32) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    /// 设置NMS阈值 (0.0 - 1.0)
    pub fn with_nms_threshold(mut self, threshold: f32) -> Self {
        self.nms_threshold = threshold;
        self
    }

    pub fn with_max_detections(mut self, max_detections: usize) -> Self {
        self.max_detections = max_detections;
        self
    }

    /// 设置模型类别数，默认为 COCO 的 80 类
    pub fn with_num_classes(mut self, num_classes: usize) -> Self {
        self.num_classes = num_classes;
        self
    }

    /// 完整的检测流程：从图像到检测结果
    ///
    /// # 错误处理
    /// 如果检测过程中发生错误会返回Err
    pub fn detect(&mut self, img: &DynamicImage) -> Result<DetectionSet> {
        let (img_width, img_height) = img.dimensions();
        let resized_img = resize_image(img, self.input_width as u32, self.input_height as u32);
        let input_tensor = image_to_tensor(&resized_img, self.input_height, self.input_width);

        let start_time = Instant::now();
        let output = run_inference(&mut self.model, &input_tensor, self.num_classes)?;
        tracing::debug!(elapsed = ?start_time.elapsed(), "inference finished");

        let detections = process_detections(
            &output,
            &PostProcess {
                img_width: img_width as f32,
                img_height: img_height as f32,
                input_width: self.input_width,
                input_height: self.input_height,
                confidence_threshold: self.confidence_threshold,
                nms_threshold: self.nms_threshold,
                max_detections: self.max_detections,
            },
        );
        tracing::info!(count = detections.len(), "detection finished");
        Ok(detections.into())
    }
}

impl Inference for YoloDetector {
    fn infer(&mut self, image: &DynamicImage) -> Result<DetectionSet> {
        self.detect(image)
    }
}
