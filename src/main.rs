use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use voxsight::config::{Config, DisplayMode, InputMode, SpeechMode};
use voxsight::display::{DisplaySurface, FileDisplay};
use voxsight::voice::{ConsoleSpeaker, Speaker, TypedInput, UtteranceSource};
use voxsight::{
    CategoryRegistry, DetectionPolicy, DetectionProvider, Resolution, Session, YoloDetector,
    filter, load_image, load_model, render, resolve,
};

/// voxsight - 说出类别名，只高亮该类别的检测结果
#[derive(Parser)]
#[command(name = "voxsight", version, about)]
struct Cli {
    /// 配置文件（TOML）
    #[arg(short, long, env = "VOXSIGHT_CONFIG")]
    config: Option<PathBuf>,

    /// 输入图像，覆盖配置
    #[arg(long, env = "VOXSIGHT_IMAGE")]
    image: Option<PathBuf>,

    /// YOLO ONNX 模型，覆盖配置
    #[arg(long, env = "VOXSIGHT_MODEL")]
    model: Option<PathBuf>,

    /// 检测结果复用策略
    #[arg(long, value_enum)]
    policy: Option<DetectionPolicy>,

    /// 语句来源
    #[arg(long, value_enum)]
    input: Option<InputMode>,

    /// 语音反馈方式
    #[arg(long, value_enum)]
    speech: Option<SpeechMode>,

    /// 显示方式
    #[arg(long, value_enum)]
    display: Option<DisplayMode>,

    /// 识别/合成接口的 API key
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// 提高日志级别（-v, -vv, -vvv）
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// 列出可识别的类别
    Categories,
    /// 只做一次检测并打印结果；给出类别时同时保存叠加图
    Detect {
        /// 类别名（忽略大小写）
        category: Option<String>,
        /// 叠加图输出路径，默认使用配置中的 display.output_path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "info,voxsight=info",
        1 => "info,voxsight=debug",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(image) = cli.image {
        config.image_path = image;
    }
    if let Some(model) = cli.model {
        config.model_path = model;
    }
    if let Some(policy) = cli.policy {
        config.detection_policy = policy;
    }
    if let Some(input) = cli.input {
        config.voice.input = input;
    }
    if let Some(speech) = cli.speech {
        config.voice.speech = speech;
    }
    if let Some(display) = cli.display {
        config.display.mode = display;
    }
    tracing::debug!(?config, "configuration resolved");

    let registry = CategoryRegistry::coco();

    match cli.command {
        Some(Command::Categories) => {
            for category in registry.iter() {
                println!("{:>2}  {}", category.id, category.name);
            }
            Ok(())
        }
        Some(Command::Detect { category, output }) => {
            detect_once(&config, registry, category.as_deref(), output)
        }
        None => {
            let base = load_image(&config.image_path)?;
            let model = load_model(&config.model_path, config.detector.intra_threads)?;
            let detector =
                YoloDetector::from_config(model, &config.detector).with_num_classes(registry.len());
            let provider = DetectionProvider::new(Box::new(detector), config.detection_policy);

            let mut session = Session::new(
                registry,
                base,
                provider,
                utterance_source(&config, cli.api_key.clone())?,
                speaker(&config, cli.api_key),
                display(&config),
            )
            .with_style(config.overlay)
            .with_echo_transcript(config.voice.echo_transcript);

            tracing::info!(
                image = %config.image_path.display(),
                policy = ?session.provider().policy(),
                "voxsight ready - say a category name"
            );
            session.run().await;
            Ok(())
        }
    }
}

fn detect_once(
    config: &Config,
    registry: &CategoryRegistry,
    category: Option<&str>,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let base = load_image(&config.image_path)?;
    let model = load_model(&config.model_path, config.detector.intra_threads)?;
    let detections = YoloDetector::from_config(model, &config.detector)
        .with_num_classes(registry.len())
        .detect(&base)?;

    for (i, detection) in detections.iter().enumerate() {
        let name = registry.get(detection.class_id).map_or("?", |c| c.name);
        println!(
            "{:>3}: {} - {:.2} - ({:.1}, {:.1}, {:.1}, {:.1})",
            i + 1,
            name,
            detection.confidence,
            detection.bbox.x1,
            detection.bbox.y1,
            detection.bbox.x2,
            detection.bbox.y2
        );
    }

    let Some(utterance) = category else {
        return Ok(());
    };
    let Resolution::Found(category) = resolve(registry, utterance) else {
        anyhow::bail!("category '{utterance}' not found");
    };

    let filtered = filter(&detections, category.id);
    let image = render(&base, &filtered, &category, &config.overlay);
    let path = output.unwrap_or_else(|| config.display.output_path.clone());
    FileDisplay::new(path).show(&image)?;
    Ok(())
}

fn utterance_source(
    config: &Config,
    api_key: Option<String>,
) -> anyhow::Result<Box<dyn UtteranceSource>> {
    match config.voice.input {
        InputMode::Typed => Ok(Box::new(TypedInput::stdin())),
        InputMode::Microphone => microphone(config, api_key),
    }
}

#[cfg(feature = "audio")]
fn microphone(config: &Config, api_key: Option<String>) -> anyhow::Result<Box<dyn UtteranceSource>> {
    use voxsight::voice::{AudioCapture, MicrophoneListener, SpeechToText};

    let stt = SpeechToText::new(
        config.voice.stt_url.clone(),
        config.voice.stt_model.clone(),
        api_key,
    );
    Ok(Box::new(MicrophoneListener::new(
        AudioCapture::open()?,
        stt,
        &config.voice,
    )))
}

#[cfg(not(feature = "audio"))]
fn microphone(_config: &Config, _api_key: Option<String>) -> anyhow::Result<Box<dyn UtteranceSource>> {
    tracing::warn!("built without audio support, reading utterances from stdin");
    Ok(Box::new(TypedInput::stdin()))
}

fn speaker(config: &Config, api_key: Option<String>) -> Box<dyn Speaker> {
    match config.voice.speech {
        SpeechMode::Console => Box::new(ConsoleSpeaker),
        SpeechMode::Voice => voice_speaker(config, api_key),
    }
}

#[cfg(feature = "audio")]
fn voice_speaker(config: &Config, api_key: Option<String>) -> Box<dyn Speaker> {
    use voxsight::voice::{AudioPlayback, TextToSpeech, VoiceSpeaker};

    match AudioPlayback::new() {
        Ok(playback) => {
            let tts = TextToSpeech::new(
                config.voice.tts_url.clone(),
                config.voice.tts_model.clone(),
                config.voice.tts_voice.clone(),
                api_key,
            );
            Box::new(VoiceSpeaker::new(tts, playback))
        }
        Err(e) => {
            tracing::warn!(error = %e, "no audio output, speech feedback goes to the console");
            Box::new(ConsoleSpeaker)
        }
    }
}

#[cfg(not(feature = "audio"))]
fn voice_speaker(_config: &Config, _api_key: Option<String>) -> Box<dyn Speaker> {
    tracing::warn!("built without audio support, speech feedback goes to the console");
    Box::new(ConsoleSpeaker)
}

fn display(config: &Config) -> Box<dyn DisplaySurface> {
    match config.display.mode {
        DisplayMode::File => Box::new(FileDisplay::new(config.display.output_path.clone())),
        DisplayMode::Window => window(config),
    }
}

#[cfg(feature = "window")]
fn window(config: &Config) -> Box<dyn DisplaySurface> {
    Box::new(voxsight::display::WindowDisplay::new(config.display.window_title.clone()))
}

#[cfg(not(feature = "window"))]
fn window(config: &Config) -> Box<dyn DisplaySurface> {
    tracing::warn!("built without window support, writing overlays to a file");
    Box::new(FileDisplay::new(config.display.output_path.clone()))
}
