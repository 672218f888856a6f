use ndarray::{Array2, Array4};
use ort::{inputs, session::Session, value::Tensor};

use crate::config::MODEL_INPUT_NAME;
use crate::{Error, Result};

/// 运行模型推理
///
/// 使用ONNX模型对输入张量进行推理，返回形状为(num_boxes, 4 + num_classes)的二维数组，
/// 每行为 [cx, cy, w, h, class_0_score, class_1_score, ...]，坐标相对于模型输入尺寸。
///
/// # 参数
/// * `model` - 已加载的模型会话
/// * `input` - NCHW 输入张量
/// * `num_classes` - 模型的类别数，用于判断输出布局
///
/// # 错误处理
/// 如果推理过程中发生错误，或输出形状不符合预期会返回Err
pub fn run_inference(
    model: &mut Session,
    input: &Array4<f32>,
    num_classes: usize,
) -> Result<Array2<f32>> {
    let shape: Vec<usize> = input.shape().to_vec();
    let (data, _offset) = input.clone().into_raw_vec_and_offset();
    let input_tensor = Tensor::from_array(([shape[0], shape[1], shape[2], shape[3]], data))?;
    let outputs = model.run(inputs![MODEL_INPUT_NAME => input_tensor])?;

    let (output_shape, output_data) = outputs[0].try_extract_tensor::<f32>()?;
    let dims: Vec<usize> = output_shape.iter().map(|&d| d as usize).collect();

    decode_output(&dims, output_data.to_vec(), num_classes)
}

/// 把原始输出整理为每行一个候选框
///
/// YOLOv8/11 导出的输出形状为 [1, 4 + nc, num_boxes]（通道在前），
/// 部分导出为 [1, num_boxes, 4 + nc]。按已知的通道数 4 + nc 判断布局，
/// 两个轴都等于通道数时按通道在前处理。
pub fn decode_output(dims: &[usize], data: Vec<f32>, num_classes: usize) -> Result<Array2<f32>> {
    if dims.len() != 3 || dims[0] != 1 {
        return Err(Error::Output(format!("unexpected output shape {dims:?}")));
    }

    let channels = 4 + num_classes;
    let (a, b) = (dims[1], dims[2]);
    let rows = Array2::from_shape_vec((a, b), data)?;

    if a == channels {
        Ok(rows.reversed_axes().as_standard_layout().into_owned())
    } else if b == channels {
        Ok(rows)
    } else {
        Err(Error::Output(format!(
            "output shape {dims:?} has no axis of {channels} (4 box + {num_classes} class) channels"
        )))
    }
}
