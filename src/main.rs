use std::path::PathBuf;

use anyhow::Context;
use clap::{CommandFactory, Parser};

use docuglot::client::GeminiClient;
use docuglot::config::{init_default_config, ResolvedConfig, CONFIG_ENV_VAR};
use docuglot::pipeline::{DocumentFormat, DocumentPipeline};
use docuglot::progress::ConsoleProgress;

#[derive(Parser, Debug)]
#[command(name = "docuglot")]
#[command(about = "Format-preserving office document translator (docx/xlsx)", long_about = None)]
struct Args {
    /// Generate a default config file, then exit
    #[arg(long)]
    init_config: bool,

    /// Directory to write the config file (default: current directory)
    #[arg(long, value_name = "DIR")]
    init_config_dir: Option<PathBuf>,

    /// Overwrite an existing config file when used with --init-config
    #[arg(long)]
    force: bool,

    /// Input document (.docx or .xlsx)
    #[arg(value_name = "FILE")]
    input: Option<PathBuf>,

    /// Output document (default: <input_stem>.<target_lang>.<ext>)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Target language (ISO-639-1 code such as "ko", or a language name)
    #[arg(short = 't', long)]
    target_lang: Option<String>,

    /// Config file path (default: search for docuglot.toml upwards)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Force the container format instead of probing ("docx" or "xlsx")
    #[arg(long, value_name = "FORMAT")]
    format: Option<String>,

    /// Suppress progress output
    #[arg(long)]
    quiet: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if args.init_config {
        let dir = args
            .init_config_dir
            .clone()
            .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));
        let cfg_path = init_default_config(&dir, args.force).context("init default config")?;
        eprintln!("Wrote config: {}", cfg_path.display());
        return Ok(());
    }

    let input = match args.input {
        Some(p) => p,
        None => {
            let mut cmd = Args::command();
            cmd.print_help().context("print help")?;
            eprintln!(
                "\n\nUSAGE:\n  docuglot <input.docx|input.xlsx> -t <lang>\n\nTIPS:\n  - Default config search: docuglot.toml (upwards), or set {CONFIG_ENV_VAR}.\n  - The translation API key is read from the env var named in the config.\n"
            );
            return Ok(());
        }
    };
    let target_lang = args
        .target_lang
        .context("missing -t/--target-lang")?;

    let workdir = input
        .parent()
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."));
    let cfg = ResolvedConfig::resolve(&workdir, args.config).context("load config")?;

    let api_key = std::env::var(&cfg.api_key_env)
        .with_context(|| format!("missing API key env var: {}", cfg.api_key_env))?;

    let format = match args.format.as_deref() {
        Some("docx") => Some(DocumentFormat::Docx),
        Some("xlsx") => Some(DocumentFormat::Xlsx),
        Some(other) => anyhow::bail!("unknown format: {other} (expected docx or xlsx)"),
        None => DocumentFormat::from_extension(&input),
    };

    let output = match args.output {
        Some(p) => p,
        None => {
            let stem = input
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("output");
            let ext = input
                .extension()
                .and_then(|s| s.to_str())
                .unwrap_or("docx");
            input.with_file_name(format!("{stem}.{target_lang}.{ext}"))
        }
    };

    let progress = ConsoleProgress::new(!args.quiet);
    progress.info(format!("Read input: {}", input.display()));
    let buf = std::fs::read(&input).with_context(|| format!("read input: {}", input.display()))?;

    let client = GeminiClient::new(cfg.api_base.clone(), api_key, cfg.model.clone(), cfg.timeout)
        .context("build translation client")?;
    let pipeline = DocumentPipeline::new(&client, cfg.options, progress);

    let translated = match format {
        Some(f) => pipeline.translate_as(&buf, f, &target_lang)?,
        None => pipeline.translate(&buf, &target_lang)?,
    };

    std::fs::write(&output, translated)
        .with_context(|| format!("write output: {}", output.display()))?;
    eprintln!("Wrote output: {}", output.display());
    Ok(())
}
