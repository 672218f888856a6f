//! 语音识别（STT），调用 Whisper 兼容的 HTTP 接口

use crate::{Error, Result};

/// Whisper 兼容接口的返回
#[derive(serde::Deserialize)]
struct WhisperResponse {
    text: String,
}

/// 把 WAV 音频转写为文本
pub struct SpeechToText {
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
    model: String,
}

impl SpeechToText {
    /// 创建识别客户端
    ///
    /// 本地部署的服务不需要鉴权时 `api_key` 传 `None`。
    pub fn new(url: String, model: String, api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
            api_key: api_key.filter(|key| !key.is_empty()),
            model,
        }
    }

    /// 转写音频
    ///
    /// # Errors
    ///
    /// 服务不可达或拒绝请求时返回 `Error::ServiceUnavailable`；
    /// 没有识别出任何内容时返回 `Error::Transcription`
    pub async fn transcribe(&self, audio: &[u8]) -> Result<String> {
        tracing::debug!(audio_bytes = audio.len(), "starting transcription");

        let form = reqwest::multipart::Form::new()
            .part(
                "file",
                reqwest::multipart::Part::bytes(audio.to_vec())
                    .file_name("audio.wav")
                    .mime_str("audio/wav")
                    .map_err(|e| Error::ServiceUnavailable(e.to_string()))?,
            )
            .text("model", self.model.clone());

        let mut request = self.client.post(&self.url).multipart(form);
        if let Some(key) = &self.api_key {
            request = request.header("Authorization", format!("Bearer {key}"));
        }

        let response = request.send().await.map_err(|e| {
            tracing::error!(error = %e, "transcription request failed");
            e
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "transcription API error");
            return Err(Error::ServiceUnavailable(format!("STT error {status}: {body}")));
        }

        // 传输中断仍算服务不可用；能收到 200 但内容无法解析则算识别失败
        let body = response.bytes().await?;
        let transcript = parse_transcript(&body)?;

        tracing::debug!(transcript = %transcript, "transcription complete");
        Ok(transcript)
    }
}

/// 解析识别服务返回的 JSON 并清理文本
///
/// # Errors
///
/// 内容不是合法的识别结果，或清理后为空时返回 `Error::Transcription`
pub fn parse_transcript(body: &[u8]) -> Result<String> {
    let result: WhisperResponse = serde_json::from_slice(body)
        .map_err(|e| Error::Transcription(format!("malformed transcription response: {e}")))?;

    let transcript = clean_transcript(&result.text);
    if transcript.is_empty() {
        return Err(Error::Transcription("empty transcript".to_string()));
    }
    Ok(transcript)
}

/// 去掉首尾空白以及识别服务附加的句末标点
///
/// "Car." 与 "car" 交给解析器时必须是同一句话。
pub fn clean_transcript(text: &str) -> String {
    text.trim()
        .trim_matches(|c: char| matches!(c, '.' | ',' | '!' | '?' | '"' | '\'') || c.is_whitespace())
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_punctuation_is_removed() {
        assert_eq!(clean_transcript(" Car. "), "Car");
        assert_eq!(clean_transcript("Traffic light!"), "Traffic light");
        assert_eq!(clean_transcript("\"dog?\""), "dog");
    }

    #[test]
    fn inner_text_is_untouched() {
        assert_eq!(clean_transcript("hot dog"), "hot dog");
        assert_eq!(clean_transcript("teddy bear, please"), "teddy bear, please");
    }

    #[test]
    fn punctuation_only_is_empty() {
        assert_eq!(clean_transcript(" ... "), "");
    }

    #[test]
    fn response_body_is_parsed_and_cleaned() {
        assert_eq!(parse_transcript(br#"{"text":" Car. "}"#).unwrap(), "Car");
    }

    #[test]
    fn malformed_response_is_a_transcription_failure() {
        for body in [&b"<html>busy</html>"[..], br#"{"txt":"car"}"#, br#"{"text":"..."}"#] {
            let err = parse_transcript(body).unwrap_err();
            assert!(matches!(err, Error::Transcription(_)), "{err:?}");
        }
    }

    #[test]
    fn empty_api_key_is_ignored() {
        let stt = SpeechToText::new("http://localhost/v1".into(), "whisper-1".into(), Some(String::new()));
        assert!(stt.api_key.is_none());
    }
}
