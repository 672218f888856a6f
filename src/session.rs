//! 交互循环
//!
//! 显式状态机：`Idle → Listening → Resolving → (Rendering | Feedback) → Idle`，
//! 渲染显示之后检查退出信号，进入 `Terminated`。
//! 任何可恢复的错误都回到 `Idle`，循环本身不会因错误而结束。

use image::DynamicImage;

use crate::detect::{DetectionProvider, filter};
use crate::display::DisplaySurface;
use crate::overlay::{OverlayStyle, render};
use crate::registry::{Category, CategoryRegistry};
use crate::resolve::{Resolution, resolve};
use crate::voice::{Speaker, UtteranceSource};
use crate::{Error, Result};

/// 类别不在表中时朗读的提示
pub const NOT_FOUND_FEEDBACK: &str = "Category not found, try again.";

/// 需要反馈给用户的情况
#[derive(Debug, Clone, PartialEq)]
pub enum Feedback {
    /// 语句不是任何类别名
    NotFound(String),
    /// 听不清
    Unintelligible(String),
    /// 识别服务不可达
    ServiceUnavailable(String),
    /// 音频设备等其他采集错误
    CaptureFailed(String),
    /// 推理、绘制或显示失败，只影响本轮
    CycleFailed(String),
}

/// 循环状态
#[derive(Debug, Clone, PartialEq)]
pub enum LoopState {
    Idle,
    Listening,
    Resolving(String),
    Rendering(Category),
    Feedback(Feedback),
    /// 本轮结果已显示，等待检查退出信号
    Displayed,
    Terminated,
}

/// 运行统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// 采集尝试次数
    pub cycles: usize,
    /// 成功显示的次数
    pub renders: usize,
    /// 未匹配到类别的次数
    pub misses: usize,
    /// 识别或本轮处理失败的次数
    pub failures: usize,
}

/// 一次交互会话：一张静态图像，多轮语音查询
pub struct Session<'r> {
    registry: &'r CategoryRegistry,
    /// 底图，只读
    base: DynamicImage,
    provider: DetectionProvider,
    source: Box<dyn UtteranceSource>,
    speaker: Box<dyn Speaker>,
    display: Box<dyn DisplaySurface>,
    style: OverlayStyle,
    echo_transcript: bool,
    stats: SessionStats,
}

impl<'r> Session<'r> {
    pub fn new(
        registry: &'r CategoryRegistry,
        base: DynamicImage,
        provider: DetectionProvider,
        source: Box<dyn UtteranceSource>,
        speaker: Box<dyn Speaker>,
        display: Box<dyn DisplaySurface>,
    ) -> Self {
        Self {
            registry,
            base,
            provider,
            source,
            speaker,
            display,
            style: OverlayStyle::default(),
            echo_transcript: false,
            stats: SessionStats::default(),
        }
    }

    pub fn with_style(mut self, style: OverlayStyle) -> Self {
        self.style = style;
        self
    }

    /// 识别成功后朗读 "You said: ..."
    pub fn with_echo_transcript(mut self, echo: bool) -> Self {
        self.echo_transcript = echo;
        self
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    pub fn provider(&self) -> &DetectionProvider {
        &self.provider
    }

    /// 一直运行到收到退出信号
    pub async fn run(&mut self) -> SessionStats {
        let mut state = LoopState::Idle;
        while state != LoopState::Terminated {
            state = self.step(state).await;
        }

        tracing::info!(
            cycles = self.stats.cycles,
            renders = self.stats.renders,
            misses = self.stats.misses,
            failures = self.stats.failures,
            "session terminated"
        );
        self.stats
    }

    /// 状态转移函数
    pub async fn step(&mut self, state: LoopState) -> LoopState {
        match state {
            LoopState::Idle => {
                tracing::info!("Listening...");
                LoopState::Listening
            }
            LoopState::Listening => self.listen().await,
            LoopState::Resolving(text) => self.resolve_utterance(text).await,
            LoopState::Rendering(category) => match self.render_cycle(&category) {
                Ok(()) => {
                    self.stats.renders += 1;
                    LoopState::Displayed
                }
                Err(err) => LoopState::Feedback(Feedback::CycleFailed(err.to_string())),
            },
            LoopState::Feedback(feedback) => {
                self.emit(feedback).await;
                LoopState::Idle
            }
            LoopState::Displayed => {
                if self.display.quit_requested() {
                    tracing::info!("quit requested");
                    LoopState::Terminated
                } else {
                    LoopState::Idle
                }
            }
            LoopState::Terminated => LoopState::Terminated,
        }
    }

    async fn listen(&mut self) -> LoopState {
        self.stats.cycles += 1;
        match self.source.capture_utterance().await {
            Ok(text) => LoopState::Resolving(text),
            Err(Error::InputClosed) => {
                tracing::info!("utterance input closed");
                LoopState::Terminated
            }
            Err(Error::Transcription(reason)) => {
                LoopState::Feedback(Feedback::Unintelligible(reason))
            }
            Err(Error::ServiceUnavailable(reason)) => {
                LoopState::Feedback(Feedback::ServiceUnavailable(reason))
            }
            Err(err) => LoopState::Feedback(Feedback::CaptureFailed(err.to_string())),
        }
    }

    async fn resolve_utterance(&mut self, text: String) -> LoopState {
        tracing::info!("Did you say: {text}");
        if self.echo_transcript {
            self.say(&format!("You said: {text}")).await;
        }

        match resolve(self.registry, &text) {
            Resolution::Found(category) => {
                tracing::info!(id = %category.id, "Category '{}' resolved", category.name);
                LoopState::Rendering(category)
            }
            Resolution::NotFound => LoopState::Feedback(Feedback::NotFound(text)),
        }
    }

    fn render_cycle(&mut self, category: &Category) -> Result<()> {
        let detections = self.provider.detections(&self.base)?;
        let filtered = filter(detections, category.id);
        tracing::info!(
            category = category.name,
            matched = filtered.len(),
            total = detections.len(),
            "rendering detections"
        );

        let image = render(&self.base, &filtered, category, &self.style);
        self.display.show(&image)
    }

    async fn emit(&mut self, feedback: Feedback) {
        match feedback {
            Feedback::NotFound(text) => {
                self.stats.misses += 1;
                tracing::warn!("Category '{text}' not found");
                self.say(NOT_FOUND_FEEDBACK).await;
            }
            Feedback::Unintelligible(reason) => {
                self.stats.failures += 1;
                tracing::warn!(%reason, "Could not understand audio. Please try again.");
            }
            Feedback::ServiceUnavailable(reason) => {
                self.stats.failures += 1;
                tracing::warn!("Could not request results; {reason}");
            }
            Feedback::CaptureFailed(reason) => {
                self.stats.failures += 1;
                tracing::error!(%reason, "audio capture failed");
            }
            Feedback::CycleFailed(reason) => {
                self.stats.failures += 1;
                tracing::error!(%reason, "detection cycle failed");
            }
        }
    }

    async fn say(&mut self, text: &str) {
        if let Err(err) = self.speaker.speak(text).await {
            tracing::warn!(error = %err, "speech feedback failed");
        }
    }
}
