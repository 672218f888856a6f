//! 语音反馈

use async_trait::async_trait;

use crate::voice::Speaker;
use crate::Result;

/// 只把反馈打印到控制台
#[derive(Debug, Default)]
pub struct ConsoleSpeaker;

#[async_trait(?Send)]
impl Speaker for ConsoleSpeaker {
    async fn speak(&mut self, text: &str) -> Result<()> {
        println!("[speech] {text}");
        Ok(())
    }
}

/// 合成语音并在扬声器上播放，播完才返回
#[cfg(feature = "audio")]
pub struct VoiceSpeaker {
    tts: crate::voice::tts::TextToSpeech,
    playback: crate::voice::playback::AudioPlayback,
}

#[cfg(feature = "audio")]
impl VoiceSpeaker {
    pub fn new(
        tts: crate::voice::tts::TextToSpeech,
        playback: crate::voice::playback::AudioPlayback,
    ) -> Self {
        Self { tts, playback }
    }
}

#[cfg(feature = "audio")]
#[async_trait(?Send)]
impl Speaker for VoiceSpeaker {
    async fn speak(&mut self, text: &str) -> Result<()> {
        let audio = self.tts.synthesize(text).await?;
        self.playback.play_mp3(&audio)
    }
}
