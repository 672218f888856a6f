//! 麦克风采集
//!
//! 设备回调线程把单声道样本追加到共享缓冲区，`MicrophoneListener` 每次轮询时整段取走，
//! 再自己切成固定长度的帧交给静音门。

use std::io::Cursor;
use std::sync::{Arc, Mutex};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, SampleRate, Stream, StreamConfig};

use crate::{Error, Result};

/// 采样率（16kHz，语音识别常用）
pub const SAMPLE_RATE: u32 = 16000;

fn audio_error(err: impl std::fmt::Display) -> Error {
    Error::Audio(err.to_string())
}

/// 默认输入设备上的一路 16kHz 采集
///
/// 设备只提供多声道时，回调里按帧取平均混成单声道。
pub struct AudioCapture {
    device: Device,
    config: StreamConfig,
    samples: Arc<Mutex<Vec<f32>>>,
    stream: Option<Stream>,
}

impl AudioCapture {
    /// 打开默认输入设备，选声道最少的 f32 / 16kHz 配置
    ///
    /// # Errors
    ///
    /// 没有输入设备或没有可用配置时返回 `Error::Audio`
    pub fn open() -> Result<Self> {
        let device = cpal::default_host()
            .default_input_device()
            .ok_or_else(|| Error::Audio("no input device available".to_string()))?;

        let rate = SampleRate(SAMPLE_RATE);
        let range = device
            .supported_input_configs()
            .map_err(audio_error)?
            .filter(|c| {
                c.sample_format() == SampleFormat::F32
                    && c.min_sample_rate() <= rate
                    && c.max_sample_rate() >= rate
            })
            .min_by_key(|c| c.channels())
            .ok_or_else(|| Error::Audio("no 16 kHz f32 input config".to_string()))?;
        let config = range.with_sample_rate(rate).config();

        tracing::debug!(
            device = %device.name().unwrap_or_default(),
            channels = config.channels,
            "microphone opened"
        );

        Ok(Self {
            device,
            config,
            samples: Arc::new(Mutex::new(Vec::new())),
            stream: None,
        })
    }

    /// 丢弃旧样本并开始一段新的采集
    ///
    /// # Errors
    ///
    /// 输入流无法建立或启动时返回 `Error::Audio`
    pub fn start(&mut self) -> Result<()> {
        self.stop();
        if let Ok(mut samples) = self.samples.lock() {
            samples.clear();
        }

        let samples = Arc::clone(&self.samples);
        let channels = usize::from(self.config.channels.max(1));
        let stream = self
            .device
            .build_input_stream(
                &self.config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    if let Ok(mut samples) = samples.lock() {
                        samples.extend(
                            data.chunks(channels)
                                .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32),
                        );
                    }
                },
                |err| tracing::error!(error = %err, "microphone stream error"),
                None,
            )
            .map_err(audio_error)?;

        stream.play().map_err(audio_error)?;
        self.stream = Some(stream);
        Ok(())
    }

    /// 关闭输入流；已采集的样本保留到下一次 `start`
    pub fn stop(&mut self) {
        self.stream = None;
    }

    /// 把上次调用之后采集到的样本追加到 `pending`，返回追加的数量
    pub fn drain_into(&self, pending: &mut Vec<f32>) -> usize {
        match self.samples.lock() {
            Ok(mut samples) => {
                let count = samples.len();
                pending.append(&mut *samples);
                count
            }
            Err(_) => 0,
        }
    }
}

/// 把 [-1, 1] 的样本编码为 16 位单声道 WAV，供识别接口上传
///
/// # Errors
///
/// 编码失败时返回 `Error::Audio`
pub fn encode_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::with_capacity(44 + samples.len() * 2));
    let mut writer = hound::WavWriter::new(&mut cursor, spec).map_err(audio_error)?;
    for &sample in samples {
        let sample = (sample.clamp(-1.0, 1.0) * f32::from(i16::MAX)) as i16;
        writer.write_sample(sample).map_err(audio_error)?;
    }
    writer.finalize().map_err(audio_error)?;

    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wav_has_header_and_sixteen_bit_samples() {
        let wav = encode_wav(&[0.0, 0.5, -0.5, 1.0], SAMPLE_RATE).unwrap();
        assert_eq!(&wav[..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
        // 44 字节头 + 4 个样本 × 2 字节
        assert_eq!(wav.len(), 44 + 8);

        let reader = hound::WavReader::new(Cursor::new(wav)).unwrap();
        assert_eq!(reader.spec().sample_rate, SAMPLE_RATE);
        let samples: Vec<i16> = reader.into_samples().map(|s| s.unwrap()).collect();
        assert_eq!(samples, vec![0, 16383, -16383, 32767]);
    }

    #[test]
    fn out_of_range_samples_are_clipped() {
        let wav = encode_wav(&[2.0, -3.0], SAMPLE_RATE).unwrap();
        let reader = hound::WavReader::new(Cursor::new(wav)).unwrap();
        let samples: Vec<i16> = reader.into_samples().map(|s| s.unwrap()).collect();
        assert_eq!(samples, vec![i16::MAX, -i16::MAX]);
    }
}
