use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::detect::DetectionPolicy;
use crate::overlay::OverlayStyle;
use crate::{Error, Result};

pub const DEFAULT_IMAGE_PATH: &str = "./input_image.jpg";
pub const DEFAULT_MODEL_PATH: &str = "yolov8n.onnx";
pub const MODEL_INPUT_NAME: &str = "images";

// 目标检测超参数配置
pub const DEFAULT_INPUT_WIDTH: usize = 640;
pub const DEFAULT_INPUT_HEIGHT: usize = 640;
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.25;
pub const DEFAULT_NMS_THRESHOLD: f32 = 0.7;
pub const DEFAULT_MAX_DETECTIONS: usize = 300;
pub const DEFAULT_INTRA_THREADS: usize = 4;

// 语音采集参数（毫秒）
pub const DEFAULT_AMBIENT_DURATION_MS: u64 = 200;
pub const DEFAULT_PAUSE_THRESHOLD_MS: u64 = 800;
pub const DEFAULT_ENERGY_FLOOR: f32 = 0.01;
pub const DEFAULT_DYNAMIC_ENERGY_RATIO: f32 = 1.5;

pub const DEFAULT_STT_URL: &str = "https://api.openai.com/v1/audio/transcriptions";
pub const DEFAULT_STT_MODEL: &str = "whisper-1";
pub const DEFAULT_TTS_URL: &str = "https://api.openai.com/v1/audio/speech";
pub const DEFAULT_TTS_MODEL: &str = "tts-1";
pub const DEFAULT_TTS_VOICE: &str = "alloy";

pub const DEFAULT_WINDOW_TITLE: &str = "Real-Time Detection";
pub const DEFAULT_OUTPUT_PATH: &str = "results/overlay.png";

/// 运行配置
///
/// 启动时读取一次。TOML 中省略的字段使用上面的默认常量。
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 输入图像路径
    pub image_path: PathBuf,
    /// YOLO ONNX 模型路径
    pub model_path: PathBuf,
    /// 检测结果的复用策略
    pub detection_policy: DetectionPolicy,
    pub detector: DetectorConfig,
    pub voice: VoiceConfig,
    pub display: DisplayConfig,
    pub overlay: OverlayStyle,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            image_path: PathBuf::from(DEFAULT_IMAGE_PATH),
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            detection_policy: DetectionPolicy::default(),
            detector: DetectorConfig::default(),
            voice: VoiceConfig::default(),
            display: DisplayConfig::default(),
            overlay: OverlayStyle::default(),
        }
    }
}

/// 检测器参数
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    pub input_width: usize,
    pub input_height: usize,
    /// 置信度阈值，低于此值的检测结果将被过滤
    pub confidence_threshold: f32,
    /// NMS 阈值
    pub nms_threshold: f32,
    pub max_detections: usize,
    pub intra_threads: usize,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            input_width: DEFAULT_INPUT_WIDTH,
            input_height: DEFAULT_INPUT_HEIGHT,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            nms_threshold: DEFAULT_NMS_THRESHOLD,
            max_detections: DEFAULT_MAX_DETECTIONS,
            intra_threads: DEFAULT_INTRA_THREADS,
        }
    }
}

/// 语句来源
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum InputMode {
    /// 麦克风采集 + 语音识别
    #[default]
    Microphone,
    /// 从标准输入逐行读取
    Typed,
}

/// 语音反馈方式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SpeechMode {
    /// 语音合成并播放
    #[default]
    Voice,
    /// 只打印到控制台
    Console,
}

/// 语音采集、识别与合成参数
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VoiceConfig {
    pub input: InputMode,
    pub speech: SpeechMode,
    /// 每次采集前的环境噪声校准时长
    pub ambient_duration_ms: u64,
    /// 语句结束前需要的静音时长
    pub pause_threshold_ms: u64,
    /// 能量阈值下限（RMS，样本范围 [-1, 1]）
    pub energy_floor: f32,
    /// 校准后阈值 = 环境 RMS × 该系数
    pub dynamic_energy_ratio: f32,
    /// 单句最长时长，`None` 表示不限制
    pub phrase_time_limit_ms: Option<u64>,
    pub stt_url: String,
    pub stt_model: String,
    pub tts_url: String,
    pub tts_model: String,
    pub tts_voice: String,
    /// 识别成功后朗读 "You said: ..."
    pub echo_transcript: bool,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            input: InputMode::default(),
            speech: SpeechMode::default(),
            ambient_duration_ms: DEFAULT_AMBIENT_DURATION_MS,
            pause_threshold_ms: DEFAULT_PAUSE_THRESHOLD_MS,
            energy_floor: DEFAULT_ENERGY_FLOOR,
            dynamic_energy_ratio: DEFAULT_DYNAMIC_ENERGY_RATIO,
            phrase_time_limit_ms: None,
            stt_url: DEFAULT_STT_URL.to_string(),
            stt_model: DEFAULT_STT_MODEL.to_string(),
            tts_url: DEFAULT_TTS_URL.to_string(),
            tts_model: DEFAULT_TTS_MODEL.to_string(),
            tts_voice: DEFAULT_TTS_VOICE.to_string(),
            echo_transcript: true,
        }
    }
}

/// 显示方式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum DisplayMode {
    /// 桌面窗口，按 q 或 Esc 退出
    #[default]
    Window,
    /// 每一轮写入文件
    File,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub mode: DisplayMode,
    pub window_title: String,
    pub output_path: PathBuf,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            mode: DisplayMode::default(),
            window_title: DEFAULT_WINDOW_TITLE.to_string(),
            output_path: PathBuf::from(DEFAULT_OUTPUT_PATH),
        }
    }
}

impl Config {
    /// 读取配置文件；`path` 为 `None` 时使用默认配置
    ///
    /// # Errors
    ///
    /// 文件无法读取、TOML 解析失败或参数越界时返回错误
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path)?;
                let config = Self::from_toml_str(&text)?;
                tracing::debug!(path = %path.display(), "config loaded");
                config
            }
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// 从 TOML 文本解析配置
    ///
    /// # Errors
    ///
    /// TOML 解析失败时返回错误
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// 检查参数范围
    ///
    /// # Errors
    ///
    /// 任一参数越界时返回 `Error::Config`
    pub fn validate(&self) -> Result<()> {
        let detector = &self.detector;
        if detector.input_width == 0 || detector.input_height == 0 {
            return Err(Error::Config("model input size must be non-zero".to_string()));
        }
        if !(0.0..=1.0).contains(&detector.confidence_threshold) {
            return Err(Error::Config(format!(
                "confidence_threshold out of range: {}",
                detector.confidence_threshold
            )));
        }
        if !(0.0..=1.0).contains(&detector.nms_threshold) {
            return Err(Error::Config(format!(
                "nms_threshold out of range: {}",
                detector.nms_threshold
            )));
        }
        if self.voice.dynamic_energy_ratio < 1.0 {
            return Err(Error::Config("dynamic_energy_ratio must be >= 1.0".to_string()));
        }
        if self.overlay.font_scale == 0 {
            return Err(Error::Config("font_scale must be at least 1".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config = Config::from_toml_str(
            r#"
            image_path = "street.jpg"

            [detector]
            confidence_threshold = 0.4
            "#,
        )
        .unwrap();

        assert_eq!(config.image_path, PathBuf::from("street.jpg"));
        assert_eq!(config.model_path, PathBuf::from(DEFAULT_MODEL_PATH));
        assert!((config.detector.confidence_threshold - 0.4).abs() < f32::EPSILON);
        assert_eq!(config.detector.input_width, DEFAULT_INPUT_WIDTH);
        assert_eq!(config.detection_policy, DetectionPolicy::Cached);
        assert_eq!(config.voice.pause_threshold_ms, DEFAULT_PAUSE_THRESHOLD_MS);
        assert!(config.voice.echo_transcript);
    }

    #[test]
    fn enums_use_snake_case() {
        let config = Config::from_toml_str(
            r#"
            detection_policy = "per_utterance"

            [voice]
            input = "typed"
            speech = "console"

            [display]
            mode = "file"
            output_path = "out.png"
            "#,
        )
        .unwrap();

        assert_eq!(config.detection_policy, DetectionPolicy::PerUtterance);
        assert_eq!(config.voice.input, InputMode::Typed);
        assert_eq!(config.voice.speech, SpeechMode::Console);
        assert_eq!(config.display.mode, DisplayMode::File);
    }

    #[test]
    fn load_reads_file_and_validates() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[detector]\nnms_threshold = 1.5").unwrap();

        let err = Config::load(Some(file.path())).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn load_without_path_uses_defaults() {
        let config = Config::load(None).unwrap();
        assert_eq!(config.image_path, PathBuf::from(DEFAULT_IMAGE_PATH));
        assert_eq!(config.display.window_title, DEFAULT_WINDOW_TITLE);
    }
}
