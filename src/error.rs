//! 错误类型
//!
//! 识别类错误（`Transcription`、`ServiceUnavailable`、`Audio`）在交互循环内恢复；
//! 推理与绘制类错误只让当前这一轮失败；启动阶段的错误由二进制入口处理。

use thiserror::Error;

/// 本 crate 的 Result 别名
pub type Result<T> = std::result::Result<T, Error>;

/// voxsight 中可能出现的错误
#[derive(Debug, Error)]
pub enum Error {
    /// 配置错误
    #[error("configuration error: {0}")]
    Config(String),

    /// 音频设备或编解码错误
    #[error("audio error: {0}")]
    Audio(String),

    /// 语音无法识别（空白或听不清）
    #[error("could not understand audio: {0}")]
    Transcription(String),

    /// 识别服务不可达或返回失败
    #[error("recognition service unavailable: {0}")]
    ServiceUnavailable(String),

    /// 语音合成错误
    #[error("TTS error: {0}")]
    Tts(String),

    /// 输入源已关闭（例如键入模式下的 EOF）
    #[error("utterance input closed")]
    InputClosed,

    /// 显示窗口错误
    #[error("display error: {0}")]
    Display(String),

    /// 模型输出不符合预期
    #[error("model output error: {0}")]
    Output(String),

    /// ONNX Runtime 错误
    #[error("model error: {0}")]
    Model(#[from] ort::Error),

    /// 张量形状错误
    #[error("shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    /// 图像加载/保存错误
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// IO 错误
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML 解析错误
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl Error {
    /// 是否属于语音识别失败（循环内恢复，回到 Idle）
    #[must_use]
    pub const fn is_recognition_failure(&self) -> bool {
        matches!(
            self,
            Self::Transcription(_) | Self::ServiceUnavailable(_) | Self::Audio(_)
        )
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        // 连接、超时等传输层失败都视为服务不可用
        Self::ServiceUnavailable(err.to_string())
    }
}
