//! Voice模块 - 语句采集与语音反馈
//!
//! 交互循环只依赖两个接口：
//! - `UtteranceSource`：阻塞等待并返回一句识别好的文本
//! - `Speaker`：朗读反馈，播完才返回
//!
//! 麦克风采集与扬声器播放需要 `audio` feature；没有它时可用键入模式和控制台反馈。

pub mod gate;
pub mod speaker;
pub mod stt;
pub mod tts;
pub mod typed;

#[cfg(feature = "audio")]
pub mod capture;
#[cfg(feature = "audio")]
pub mod listener;
#[cfg(feature = "audio")]
pub mod playback;

use async_trait::async_trait;

use crate::Result;

pub use speaker::ConsoleSpeaker;
pub use stt::SpeechToText;
pub use tts::TextToSpeech;
pub use typed::TypedInput;

#[cfg(feature = "audio")]
pub use capture::AudioCapture;
#[cfg(feature = "audio")]
pub use listener::MicrophoneListener;
#[cfg(feature = "audio")]
pub use playback::AudioPlayback;
#[cfg(feature = "audio")]
pub use speaker::VoiceSpeaker;

/// 语句来源
///
/// 失败分类：
/// - `Error::Transcription`：听不清或内容为空
/// - `Error::ServiceUnavailable`：识别服务不可达
/// - `Error::Audio`：音频设备错误
/// - `Error::InputClosed`：输入已关闭，视为退出
#[async_trait(?Send)]
pub trait UtteranceSource {
    async fn capture_utterance(&mut self) -> Result<String>;
}

/// 语音反馈
#[async_trait(?Send)]
pub trait Speaker {
    async fn speak(&mut self, text: &str) -> Result<()>;
}
