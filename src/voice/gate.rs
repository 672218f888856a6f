//! 基于能量的语音门限
//!
//! 采集前先用一小段环境音校准阈值，之后逐帧判断：能量超过阈值即开始一句话，
//! 连续静音达到 `pause_frames` 帧即结束。纯计算，不依赖音频设备。

use std::collections::VecDeque;

/// 每帧时长（毫秒）
pub const FRAME_MS: u64 = 30;

/// 计算样本的均方根能量
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f32 = samples.iter().map(|s| s * s).sum();
    (sum / samples.len() as f32).sqrt()
}

/// 由环境音计算阈值：`max(floor, rms(ambient) * ratio)`
pub fn calibrate(ambient: &[f32], floor: f32, ratio: f32) -> f32 {
    (rms(ambient) * ratio).max(floor)
}

/// 门限参数（以帧计）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateConfig {
    /// 结束一句话所需的连续静音帧数
    pub pause_frames: usize,
    /// 保留在语音起点之前的帧数，避免截掉首音
    pub pre_roll_frames: usize,
    /// 单句最多帧数，`None` 表示不限制
    pub max_frames: Option<usize>,
}

impl GateConfig {
    /// 由毫秒参数换算
    pub fn from_millis(pause_ms: u64, phrase_limit_ms: Option<u64>) -> Self {
        Self {
            pause_frames: (pause_ms / FRAME_MS).max(1) as usize,
            pre_roll_frames: 5,
            max_frames: phrase_limit_ms.map(|ms| (ms / FRAME_MS).max(1) as usize),
        }
    }
}

/// 推入一帧后的状态
#[derive(Debug, Clone, PartialEq)]
pub enum GateEvent {
    /// 还没听到语音
    Waiting,
    /// 正在录一句话
    Speaking,
    /// 一句话结束，附带完整样本
    Complete(Vec<f32>),
}

#[derive(Debug)]
pub struct SpeechGate {
    threshold: f32,
    config: GateConfig,
    speaking: bool,
    silent_run: usize,
    phrase_frames: usize,
    pre_roll: VecDeque<Vec<f32>>,
    phrase: Vec<f32>,
}

impl SpeechGate {
    pub fn new(threshold: f32, config: GateConfig) -> Self {
        Self {
            threshold,
            config,
            speaking: false,
            silent_run: 0,
            phrase_frames: 0,
            pre_roll: VecDeque::with_capacity(config.pre_roll_frames + 1),
            phrase: Vec::new(),
        }
    }

    pub fn push_frame(&mut self, frame: &[f32]) -> GateEvent {
        let loud = rms(frame) > self.threshold;

        if !self.speaking {
            if !loud {
                self.pre_roll.push_back(frame.to_vec());
                while self.pre_roll.len() > self.config.pre_roll_frames {
                    self.pre_roll.pop_front();
                }
                return GateEvent::Waiting;
            }

            self.speaking = true;
            self.silent_run = 0;
            self.phrase_frames = self.pre_roll.len();
            for earlier in self.pre_roll.drain(..) {
                self.phrase.extend_from_slice(&earlier);
            }
        }

        self.phrase.extend_from_slice(frame);
        self.phrase_frames += 1;
        if loud {
            self.silent_run = 0;
        } else {
            self.silent_run += 1;
        }

        let paused = self.silent_run >= self.config.pause_frames;
        let too_long = self
            .config
            .max_frames
            .is_some_and(|max| self.phrase_frames >= max);

        if paused || too_long {
            self.speaking = false;
            self.silent_run = 0;
            self.phrase_frames = 0;
            GateEvent::Complete(std::mem::take(&mut self.phrase))
        } else {
            GateEvent::Speaking
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRAME: usize = 4;

    fn quiet() -> Vec<f32> {
        vec![0.001; FRAME]
    }

    fn loud() -> Vec<f32> {
        vec![0.5; FRAME]
    }

    fn config(pause_frames: usize) -> GateConfig {
        GateConfig {
            pause_frames,
            pre_roll_frames: 1,
            max_frames: None,
        }
    }

    #[test]
    fn calibration_respects_floor() {
        assert_eq!(calibrate(&[0.0; 16], 0.01, 1.5), 0.01);
        assert!((calibrate(&[0.2; 16], 0.01, 1.5) - 0.3).abs() < 1e-6);
    }

    #[test]
    fn quiet_frames_never_start_a_phrase() {
        let mut gate = SpeechGate::new(0.05, config(2));
        for _ in 0..50 {
            assert_eq!(gate.push_frame(&quiet()), GateEvent::Waiting);
        }
    }

    #[test]
    fn phrase_completes_after_pause() {
        let mut gate = SpeechGate::new(0.05, config(2));
        assert_eq!(gate.push_frame(&quiet()), GateEvent::Waiting);
        assert_eq!(gate.push_frame(&loud()), GateEvent::Speaking);
        assert_eq!(gate.push_frame(&loud()), GateEvent::Speaking);
        assert_eq!(gate.push_frame(&quiet()), GateEvent::Speaking);

        let GateEvent::Complete(phrase) = gate.push_frame(&quiet()) else {
            panic!("expected the phrase to complete");
        };
        // 1 帧预录 + 2 帧语音 + 2 帧静音
        assert_eq!(phrase.len(), 5 * FRAME);
        assert_eq!(gate.push_frame(&quiet()), GateEvent::Waiting);
    }

    #[test]
    fn speech_resets_the_pause_counter() {
        let mut gate = SpeechGate::new(0.05, config(2));
        gate.push_frame(&loud());
        gate.push_frame(&quiet());
        assert_eq!(gate.push_frame(&loud()), GateEvent::Speaking);
        assert_eq!(gate.push_frame(&quiet()), GateEvent::Speaking);
        assert!(matches!(gate.push_frame(&quiet()), GateEvent::Complete(_)));
    }

    #[test]
    fn phrase_limit_cuts_long_speech() {
        let mut gate = SpeechGate::new(
            0.05,
            GateConfig {
                pause_frames: 10,
                pre_roll_frames: 0,
                max_frames: Some(3),
            },
        );
        assert_eq!(gate.push_frame(&loud()), GateEvent::Speaking);
        assert_eq!(gate.push_frame(&loud()), GateEvent::Speaking);
        assert_eq!(gate.push_frame(&loud()), GateEvent::Complete(vec![0.5; 3 * FRAME]));
    }

    #[test]
    fn millis_are_converted_to_frames() {
        let config = GateConfig::from_millis(800, Some(5_000));
        assert_eq!(config.pause_frames, 26);
        assert_eq!(config.max_frames, Some(166));
    }
}
