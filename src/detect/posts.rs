use ndarray::{Array2, Axis};

use crate::detect::bounds::{BoundingBox, Detection};
use crate::registry::CategoryId;

/// 后处理参数
#[derive(Debug, Clone, Copy)]
pub struct PostProcess {
    /// 原始图像宽度
    pub img_width: f32,
    /// 原始图像高度
    pub img_height: f32,
    /// 模型输入宽度
    pub input_width: usize,
    /// 模型输入高度
    pub input_height: usize,
    pub confidence_threshold: f32,
    pub nms_threshold: f32,
    pub max_detections: usize,
}

/// 处理模型输出，应用置信度和NMS阈值
///
/// 对模型输出进行后处理，包括取最高分类别、置信度过滤、坐标转换和按类别的非极大值抑制。
/// 返回结果按置信度降序排列。
///
/// # 参数
/// * `output` - 模型输出，形状为(num_boxes, 4 + num_classes)
/// * `params` - 尺寸与阈值
pub fn process_detections(output: &Array2<f32>, params: &PostProcess) -> Vec<Detection> {
    let mut detections = Vec::with_capacity(output.len_of(Axis(0)));

    // YOLO模型输出的是相对于输入图像尺寸的坐标，需要转换为原始图像坐标
    let scale_x = params.img_width / params.input_width as f32;
    let scale_y = params.img_height / params.input_height as f32;

    for row in output.axis_iter(Axis(0)) {
        let Some((class_index, prob)) = row
            .iter()
            .skip(4)
            .copied()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(&b.1))
        else {
            continue;
        };

        if prob < params.confidence_threshold {
            continue;
        }

        let bbox = BoundingBox::from_center(
            row[0] * scale_x,
            row[1] * scale_y,
            row[2] * scale_x,
            row[3] * scale_y,
        );

        detections.push(Detection::new(CategoryId(class_index), bbox, prob.min(1.0)));
    }

    // 按置信度排序
    detections.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut kept = apply_nms(&detections, params.nms_threshold);
    kept.truncate(params.max_detections);
    kept
}

/// 应用非极大值抑制
///
/// 输入需已按置信度降序排列。只在同一类别内比较，不同类别的重叠框互不影响。
fn apply_nms(detections: &[Detection], nms_threshold: f32) -> Vec<Detection> {
    let mut result = Vec::new();
    let mut suppressed = vec![false; detections.len()];

    for i in 0..detections.len() {
        if suppressed[i] {
            continue;
        }

        result.push(detections[i]);

        for j in (i + 1)..detections.len() {
            if suppressed[j] || detections[j].class_id != detections[i].class_id {
                continue;
            }

            if detections[i].bbox.iou(&detections[j].bbox) >= nms_threshold {
                suppressed[j] = true;
            }
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    fn params() -> PostProcess {
        PostProcess {
            img_width: 1280.0,
            img_height: 640.0,
            input_width: 640,
            input_height: 640,
            confidence_threshold: 0.5,
            nms_threshold: 0.7,
            max_detections: 300,
        }
    }

    #[test]
    fn picks_best_class_and_scales_to_image() {
        let output = array![[100.0, 100.0, 20.0, 40.0, 0.1, 0.9, 0.3]];
        let detections = process_detections(&output, &params());

        assert_eq!(detections.len(), 1);
        let detection = detections[0];
        assert_eq!(detection.class_id, CategoryId(1));
        assert!((detection.confidence - 0.9).abs() < 1e-6);
        // x 方向缩放 2 倍
        assert_eq!(detection.bbox, BoundingBox::new(180.0, 80.0, 220.0, 120.0));
    }

    #[test]
    fn drops_rows_below_threshold() {
        let output = array![
            [10.0, 10.0, 4.0, 4.0, 0.2, 0.4],
            [50.0, 50.0, 4.0, 4.0, 0.6, 0.1],
        ];
        let detections = process_detections(&output, &params());
        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].class_id, CategoryId(0));
    }

    #[test]
    fn nms_is_class_aware() {
        let output = array![
            // 两个高度重叠的 class 0
            [100.0, 100.0, 50.0, 50.0, 0.8, 0.0],
            [101.0, 100.0, 50.0, 50.0, 0.95, 0.0],
            // 同一位置的 class 1 保留
            [100.0, 100.0, 50.0, 50.0, 0.0, 0.7],
        ];
        let detections = process_detections(&output, &params());

        assert_eq!(detections.len(), 2);
        assert_eq!(detections[0].class_id, CategoryId(0));
        assert!((detections[0].confidence - 0.95).abs() < 1e-6);
        assert_eq!(detections[1].class_id, CategoryId(1));
    }

    #[test]
    fn result_is_sorted_and_truncated() {
        let output = array![
            [10.0, 10.0, 4.0, 4.0, 0.6],
            [100.0, 100.0, 4.0, 4.0, 0.9],
            [300.0, 300.0, 4.0, 4.0, 0.7],
        ];
        let mut params = params();
        params.max_detections = 2;
        let detections = process_detections(&output, &params);

        let confidences: Vec<f32> = detections.iter().map(|d| d.confidence).collect();
        assert_eq!(confidences, vec![0.9, 0.7]);
    }
}
