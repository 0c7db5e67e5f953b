// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use log::{error, info, Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::io::Write;
use std::path::{Path, PathBuf};

use reelsmith::app_config::{self, Config, MediaMode, ScriptProvider};
use reelsmith::app_controller::Controller;
use reelsmith::pipeline::CompletionPolicy;
use reelsmith::prompts::TemplateSet;

/// CLI wrapper for ScriptProvider to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliScriptProvider {
    #[value(name = "openai")]
    OpenAI,
    Anthropic,
}

impl From<CliScriptProvider> for ScriptProvider {
    fn from(cli_provider: CliScriptProvider) -> Self {
        match cli_provider {
            CliScriptProvider::OpenAI => ScriptProvider::OpenAI,
            CliScriptProvider::Anthropic => ScriptProvider::Anthropic,
        }
    }
}

/// CLI wrapper for LogLevel to implement ValueEnum
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
    /// Generate content for every request in a JSON file
    Generate(GenerateArgs),

    /// List prompt templates, or show the variables one template needs
    Templates {
        /// Template file to inspect instead of the configured one
        #[arg(short, long)]
        templates_path: Option<PathBuf>,

        /// Configuration file whose `pipeline.templates_path` is used when no file is given
        #[arg(short, long, default_value = "conf.json")]
        config_path: PathBuf,

        /// Template to describe
        name: Option<String>,
    },

    /// Generate shell completions for reelsmith
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser, Debug)]
struct GenerateArgs {
    /// JSON file holding one request or an array of requests
    #[arg(value_name = "REQUESTS")]
    requests_path: PathBuf,

    /// Where to write the results (default: <REQUESTS>.results.json)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json")]
    config_path: String,

    /// Script provider to use
    #[arg(short, long, value_enum)]
    provider: Option<CliScriptProvider>,

    /// Model name for script generation
    #[arg(short, long)]
    model: Option<String>,

    /// Prompt template to render
    #[arg(short, long)]
    template: Option<String>,

    /// Requests processed at once
    #[arg(short = 'j', long)]
    jobs: Option<usize>,

    /// Fail a request when any optional stage fails
    #[arg(long)]
    strict: bool,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,

    /// Use placeholder media and an in-memory store
    #[arg(long)]
    dry_run: bool,
}

/// Reelsmith - batch short-video content generation
#[derive(Parser, Debug)]
#[command(name = "reelsmith")]
#[command(version)]
#[command(about = "Batch short-video content generation")]
#[command(long_about = "Reelsmith renders a prompt per request, asks an LLM for a video script, stores it, \
and runs the optional image, voice, music and video stages.

EXAMPLES:
    reelsmith generate requests.json                 # Generate using conf.json
    reelsmith generate -p anthropic requests.json    # Use a specific script provider
    reelsmith generate -j 2 --strict requests.json   # Two at a time, fail on stage errors
    reelsmith generate --dry-run requests.json       # Placeholder media, nothing persisted
    reelsmith templates video_content                # Show the variables a template needs
    reelsmith completions bash > reelsmith.bash      # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. If the file does not exist,
    a default one is created. API keys fall back to OPENAI_API_KEY or
    ANTHROPIC_API_KEY.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        log::set_boxed_logger(Box::new(CustomLogger::new(level)))?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: ANSI color and marker for a level
    fn style_for_level(level: Level) -> (&'static str, &'static str) {
        match level {
            Level::Error => ("\x1B[1;31m", "✗"),
            Level::Warn => ("\x1B[1;33m", "!"),
            Level::Info => ("\x1B[1;32m", " "),
            Level::Debug => ("\x1B[1;36m", "?"),
            Level::Trace => ("\x1B[1;35m", "·"),
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let (color, marker) = Self::style_for_level(record.level());
            let _ = writeln!(
                std::io::stderr(),
                "{}{} {} {}\x1B[0m",
                color,
                now,
                marker,
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
    // Trace is the ceiling; the effective level is set with log::set_max_level
    CustomLogger::init(LevelFilter::Trace)?;
    log::set_max_level(LevelFilter::Info);

    let cli = CommandLineOptions::parse();

    match cli.command {
        Commands::Completions { shell } => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "reelsmith", &mut std::io::stdout());
            Ok(())
        }
        Commands::Templates {
            templates_path,
            config_path,
            name,
        } => run_templates(templates_path, &config_path, name),
        Commands::Generate(args) => {
            if let Err(e) = run_generate(args).await {
                error!("{:#}", e);
                std::process::exit(1);
            }
            Ok(())
        }
    }
}

fn apply_overrides(config: &mut Config, options: &GenerateArgs) {
    if let Some(provider) = &options.provider {
        config.script.provider = provider.clone().into();
    }
    if let Some(model) = &options.model {
        config.script.model = model.clone();
    }
    if let Some(template) = &options.template {
        config.pipeline.template_name = template.clone();
    }
    if let Some(jobs) = options.jobs {
        config.pipeline.max_concurrent_requests = Some(jobs);
    }
    if options.strict {
        config.pipeline.completion_policy = CompletionPolicy::Strict;
    }
    if options.dry_run {
        config.media.mode = MediaMode::Placeholder;
        config.database.in_memory = true;
    }
    if let Some(log_level) = &options.log_level {
        config.log_level = log_level.clone().into();
    }
}

async fn run_generate(options: GenerateArgs) -> Result<()> {
    if let Some(cli_level) = &options.log_level {
        let level: app_config::LogLevel = cli_level.clone().into();
        log::set_max_level(level.to_level_filter());
    }

    let mut config = Config::load_or_create(Path::new(&options.config_path))
        .with_context(|| format!("Failed to load config file: {}", options.config_path))?;
    apply_overrides(&mut config, &options);
    log::set_max_level(config.log_level.to_level_filter());

    config.validate().context("Invalid configuration")?;

    info!(
        "Generating with {} ({}), template '{}'",
        config.script.provider.display_name(),
        config.script.get_model(),
        config.pipeline.template_name
    );

    let controller = Controller::with_config(config);
    let report = controller
        .run(&options.requests_path, options.output.clone(), options.dry_run)
        .await?;

    let summary = report.summary();
    if summary.failed + summary.errors > 0 {
        std::process::exit(2);
    }
    Ok(())
}

/// Template file for the `templates` command: the flag, then the config file, then none.
///
/// A missing config file is not created here.
fn resolve_templates_path(templates_path: Option<PathBuf>, config_path: &Path) -> Result<Option<PathBuf>> {
    if templates_path.is_some() || !config_path.exists() {
        return Ok(templates_path);
    }
    let config = Config::load_or_create(config_path)?;
    Ok(config.pipeline.templates_path.map(PathBuf::from))
}

fn run_templates(templates_path: Option<PathBuf>, config_path: &Path, name: Option<String>) -> Result<()> {
    let templates = match resolve_templates_path(templates_path, config_path)? {
        Some(path) => TemplateSet::from_file(path)?,
        None => TemplateSet::builtin()?,
    };

    let mut stdout = std::io::stdout();
    match name {
        Some(name) => {
            for variable in templates.required_variables(&name)? {
                writeln!(stdout, "{}", variable)?;
            }
        }
        None => {
            for name in templates.names() {
                writeln!(stdout, "{}", name)?;
            }
        }
    }
    Ok(())
}
