#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result, anyhow};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, info};
use std::io::Write;
use std::path::{Path, PathBuf};

use epubzh::AppError;
use epubzh::app_config::{self, Config, TranslationProvider};
use epubzh::{Controller, RunMode, TranslationStyle};

/// CLI Wrapper for TranslationProvider to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliTranslationProvider {
    Moonshot,
    OpenAI,
    Anthropic,
    Ollama,
}

impl From<CliTranslationProvider> for TranslationProvider {
    fn from(cli_provider: CliTranslationProvider) -> Self {
        match cli_provider {
            CliTranslationProvider::Moonshot => TranslationProvider::Moonshot,
            CliTranslationProvider::OpenAI => TranslationProvider::OpenAI,
            CliTranslationProvider::Anthropic => TranslationProvider::Anthropic,
            CliTranslationProvider::Ollama => TranslationProvider::Ollama,
        }
    }
}

/// CLI Wrapper for TranslationStyle to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliTranslationStyle {
    Fiction,
    Science,
    General,
}

impl From<CliTranslationStyle> for TranslationStyle {
    fn from(cli_style: CliTranslationStyle) -> Self {
        match cli_style {
            CliTranslationStyle::Fiction => TranslationStyle::Fiction,
            CliTranslationStyle::Science => TranslationStyle::Science,
            CliTranslationStyle::General => TranslationStyle::General,
        }
    }
}

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Translate EPUB books from English to Chinese (default command)
    Translate(TranslateArgs),

    /// Generate shell completions for epubzh
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser, Debug)]
struct TranslateArgs {
    /// Input EPUB file or directory to process
    #[arg(value_name = "INPUT_PATH")]
    input_path: PathBuf,

    /// Output directory (defaults to the directory of the input file)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Force overwrite of existing output files
    #[arg(short, long)]
    force_overwrite: bool,

    /// Translation provider to use
    #[arg(short, long, value_enum)]
    provider: Option<CliTranslationProvider>,

    /// Model name to use for translation
    #[arg(short, long)]
    model: Option<String>,

    /// Translation style
    #[arg(short, long, value_enum)]
    style: Option<CliTranslationStyle>,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json")]
    config_path: String,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,

    /// Maximum characters per translation request
    #[arg(long)]
    max_chunk_chars: Option<usize>,

    /// Write the extracted English text without translating
    #[arg(short, long)]
    extract_only: bool,
}

/// epubzh - EPUB translation from English to Chinese
///
/// Extracts the text of every chapter, translates it with an AI provider and writes a
/// new book with the original markup preserved.
#[derive(Parser, Debug)]
#[command(name = "epubzh")]
#[command(version)]
#[command(args_conflicts_with_subcommands = true)]
#[command(about = "AI-powered EPUB translation from English to Chinese")]
#[command(long_about = "epubzh translates EPUB books from English to Chinese using AI providers.

EXAMPLES:
    epubzh book.epub                            # Translate using default config
    epubzh -f book.epub                         # Force overwrite existing files
    epubzh -p openai -m gpt-4o book.epub        # Use specific provider and model
    epubzh -s fiction -o out/ book.epub         # Literary style, custom output directory
    epubzh -e book.epub                         # Extract English text without translation
    epubzh --log-level debug /books/            # Process entire directory with debug logging
    epubzh completions bash > epubzh.bash       # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config-path. If the config file doesn't exist, a default one
    will be created automatically.

SUPPORTED PROVIDERS:
    moonshot  - Moonshot AI (default, requires API key)
    openai    - OpenAI API (requires API key)
    anthropic - Anthropic Claude API (requires API key)
    ollama    - Local Ollama server")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    translate: Option<TranslateArgs>,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        log::set_boxed_logger(Box::new(CustomLogger { level: LevelFilter::Trace }))?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: Emoji for log level
    fn get_emoji_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "❌ ",
            Level::Warn => "🚧 ",
            Level::Info => " ",
            Level::Debug => "🔍 ",
            Level::Trace => "📋 ",
        }
    }

    // @returns: ANSI color code for log level
    fn get_color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "1;31",
            Level::Warn => "1;33",
            Level::Info => "1;32",
            Level::Debug => "1;36",
            Level::Trace => "1;35",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level && metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let _ = writeln!(
                std::io::stderr(),
                "\x1B[{}m{} {} {}\x1B[0m",
                Self::get_color_for_level(record.level()),
                now,
                Self::get_emoji_for_level(record.level()),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Level is refined once the config is loaded
    CustomLogger::init(LevelFilter::Info)?;

    let cli = CommandLineOptions::parse();

    match cli.command {
        Some(Commands::Completions { shell }) => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "epubzh", &mut std::io::stdout());
            Ok(())
        }
        Some(Commands::Translate(args)) => run_translate(args).await,
        None => {
            let args = cli
                .translate
                .ok_or_else(|| anyhow!("INPUT_PATH is required when no subcommand is specified"))?;
            run_translate(args).await
        }
    }
}

/// Apply command line overrides on top of the loaded configuration
fn apply_overrides(config: &mut Config, options: &TranslateArgs) {
    if let Some(provider) = &options.provider {
        config.translation.provider = provider.clone().into();
    }
    if let Some(model) = &options.model {
        config.translation.active_provider_config_mut().model = model.clone();
    }
    if let Some(style) = &options.style {
        config.translation.style = style.clone().into();
    }
    if let Some(max_chunk_chars) = options.max_chunk_chars {
        config.pipeline.max_chunk_chars = max_chunk_chars;
    }
    if let Some(log_level) = &options.log_level {
        config.log_level = log_level.clone().into();
    }
}

async fn run_translate(options: TranslateArgs) -> Result<()> {
    if let Some(cmd_log_level) = &options.log_level {
        let level: app_config::LogLevel = cmd_log_level.clone().into();
        log::set_max_level(level.to_level_filter());
    }

    let mut config = Config::load_or_create(Path::new(&options.config_path))?;
    apply_overrides(&mut config, &options);
    log::set_max_level(config.log_level.to_level_filter());

    // Extraction needs no provider credentials
    if !options.extract_only {
        config.validate().context("Configuration validation failed")?;
    }

    let controller = Controller::with_config(config)?;
    let mode = if options.extract_only { RunMode::ExtractOnly } else { RunMode::Translate };

    if options.input_path.is_file() {
        let output_dir = options
            .output_dir
            .clone()
            .or_else(|| options.input_path.parent().map(Path::to_path_buf))
            .unwrap_or_else(|| PathBuf::from("."));
        match mode {
            RunMode::Translate => {
                controller
                    .run(options.input_path.clone(), output_dir, options.force_overwrite)
                    .await?;
            }
            RunMode::ExtractOnly => {
                controller.extract(&options.input_path, &output_dir, options.force_overwrite)?;
            }
        }
    } else if options.input_path.is_dir() {
        if options.output_dir.is_some() {
            info!("--output-dir is ignored in folder mode; outputs are written next to each book");
        }
        controller
            .run_folder(options.input_path.clone(), mode, options.force_overwrite)
            .await?;
    } else {
        return Err(AppError::File(format!("Input path does not exist: {:?}", options.input_path)).into());
    }

    Ok(())
}
