//! 键入模式：从标准输入逐行读取语句，无需麦克风

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin};

use crate::voice::UtteranceSource;
use crate::{Error, Result};

pub struct TypedInput<R> {
    lines: Lines<R>,
    prompt: bool,
}

impl TypedInput<BufReader<Stdin>> {
    /// 读取标准输入，每次等待前打印提示符
    pub fn stdin() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
            prompt: true,
        }
    }
}

impl<R: AsyncBufRead + Unpin> TypedInput<R> {
    pub fn from_reader(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            prompt: false,
        }
    }
}

#[async_trait(?Send)]
impl<R: AsyncBufRead + Unpin> UtteranceSource for TypedInput<R> {
    async fn capture_utterance(&mut self) -> Result<String> {
        if self.prompt {
            let mut stdout = tokio::io::stdout();
            stdout.write_all(b"> ").await?;
            stdout.flush().await?;
        }

        match self.lines.next_line().await? {
            Some(line) if line.trim().is_empty() => {
                Err(Error::Transcription("empty input".to_string()))
            }
            Some(line) => Ok(line),
            None => Err(Error::InputClosed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reads_lines_until_closed() {
        let mut input = TypedInput::from_reader(&b"car\n\n  Teddy Bear \n"[..]);

        assert_eq!(input.capture_utterance().await.unwrap(), "car");
        assert!(matches!(input.capture_utterance().await, Err(Error::Transcription(_))));
        assert_eq!(input.capture_utterance().await.unwrap(), "  Teddy Bear ");
        assert!(matches!(input.capture_utterance().await, Err(Error::InputClosed)));
    }
}
