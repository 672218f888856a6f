//! 麦克风语句来源：采集 → 静音切分 → 识别

use std::time::Duration;

use async_trait::async_trait;

use crate::config::VoiceConfig;
use crate::voice::UtteranceSource;
use crate::voice::capture::{AudioCapture, SAMPLE_RATE, encode_wav};
use crate::voice::gate::{FRAME_MS, GateConfig, GateEvent, SpeechGate, calibrate};
use crate::voice::stt::SpeechToText;
use crate::Result;

/// 轮询采集缓冲区的间隔
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// 每帧样本数
const FRAME_LEN: usize = (SAMPLE_RATE as u64 * FRAME_MS / 1000) as usize;

/// 从麦克风听取一句话并转写
///
/// 每次采集前都重新校准环境噪声。没有总超时，一直等到有人说话。
pub struct MicrophoneListener {
    capture: AudioCapture,
    stt: SpeechToText,
    ambient: Duration,
    energy_floor: f32,
    energy_ratio: f32,
    gate: GateConfig,
}

impl MicrophoneListener {
    pub fn new(capture: AudioCapture, stt: SpeechToText, config: &VoiceConfig) -> Self {
        Self {
            capture,
            stt,
            ambient: Duration::from_millis(config.ambient_duration_ms),
            energy_floor: config.energy_floor,
            energy_ratio: config.dynamic_energy_ratio,
            gate: GateConfig::from_millis(config.pause_threshold_ms, config.phrase_time_limit_ms),
        }
    }

    async fn listen(&mut self) -> Result<Vec<f32>> {
        tokio::time::sleep(self.ambient).await;
        let mut ambient = Vec::new();
        self.capture.drain_into(&mut ambient);
        let threshold = calibrate(&ambient, self.energy_floor, self.energy_ratio);
        tracing::debug!(threshold, "ambient noise calibrated");

        let mut gate = SpeechGate::new(threshold, self.gate);
        let mut pending: Vec<f32> = Vec::new();

        loop {
            tokio::time::sleep(POLL_INTERVAL).await;
            self.capture.drain_into(&mut pending);

            let mut consumed = 0;
            while pending.len() - consumed >= FRAME_LEN {
                let frame = &pending[consumed..consumed + FRAME_LEN];
                consumed += FRAME_LEN;
                if let GateEvent::Complete(phrase) = gate.push_frame(frame) {
                    return Ok(phrase);
                }
            }
            pending.drain(..consumed);
        }
    }
}

#[async_trait(?Send)]
impl UtteranceSource for MicrophoneListener {
    async fn capture_utterance(&mut self) -> Result<String> {
        self.capture.start()?;
        let phrase = self.listen().await;
        self.capture.stop();

        let phrase = phrase?;
        tracing::debug!(
            seconds = phrase.len() as f32 / SAMPLE_RATE as f32,
            "phrase captured"
        );

        let wav = encode_wav(&phrase, SAMPLE_RATE)?;
        self.stt.transcribe(&wav).await
    }
}
