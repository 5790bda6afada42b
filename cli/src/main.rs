//! searchpdf CLI - add a searchable OCR text layer to PDF documents

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use searchpdf::{
    detect_format_from_path, has_pdf_extension, Error, LanguageCheck, OcrConfig, OcrEngine,
    OcrPipeline, PageEvent, PageRenderer, PageState, PdfDocument, TesseractEngine,
};

type CliResult = Result<(), Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(name = "searchpdf")]
#[command(author = "iyulab")]
#[command(version)]
#[command(about = "Add an invisible OCR text layer to scanned PDF documents", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the configuration template, or write it to a file
    Config {
        /// Output file (stdout if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Run OCR and save a searchable copy of the document
    Ocr {
        /// Input PDF file
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        /// Output PDF file
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,

        /// OCR language, e.g. "eng" or "deu+eng" (defaults to the document language)
        #[arg(short, long, env = "SEARCHPDF_LANG")]
        lang: Option<String>,

        /// Configuration file written by `searchpdf config`
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Rendering zoom factor (1.0 = 72 DPI)
        #[arg(long)]
        zoom: Option<f32>,

        /// Let the OCR engine report missing languages instead of checking up front
        #[arg(long)]
        lazy_language_check: bool,

        /// Render pages with PDFium instead of pdftoppm
        #[cfg(feature = "pdfium")]
        #[arg(long)]
        pdfium: bool,
    },

    /// List the languages the OCR engine has models for
    Languages {
        /// Configuration file written by `searchpdf config`
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,
    },

    /// Show page geometry and the OCR language a document would use
    Info {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },

    /// Show version information
    Version,
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Config { output } => cmd_config(output.as_deref()),
        Commands::Ocr {
            input,
            output,
            lang,
            config,
            zoom,
            lazy_language_check,
            #[cfg(feature = "pdfium")]
            pdfium,
        } => {
            let args = OcrArgs {
                lang,
                config,
                zoom,
                lazy_language_check,
                #[cfg(feature = "pdfium")]
                pdfium,
            };
            cmd_ocr(&input, &output, args)
        }
        Commands::Languages { config } => cmd_languages(config.as_deref()),
        Commands::Info { input } => cmd_info(&input),
        Commands::Version => {
            cmd_version();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

struct OcrArgs {
    lang: Option<String>,
    config: Option<PathBuf>,
    zoom: Option<f32>,
    lazy_language_check: bool,
    #[cfg(feature = "pdfium")]
    pdfium: bool,
}

fn load_config(path: Option<&Path>) -> searchpdf::Result<OcrConfig> {
    match path {
        Some(path) => OcrConfig::load(path),
        None => Ok(OcrConfig::template()),
    }
}

/// Input must be an existing PDF file; output must be named `*.pdf`.
fn check_paths(input: &Path, output: &Path) -> searchpdf::Result<()> {
    if !has_pdf_extension(input) {
        return Err(Error::InvalidArgument(format!(
            "input file must have a .pdf extension: {}",
            input.display()
        )));
    }
    if !has_pdf_extension(output) {
        return Err(Error::InvalidArgument(format!(
            "output file must have a .pdf extension: {}",
            output.display()
        )));
    }
    if !input.is_file() {
        return Err(Error::InvalidArgument(format!(
            "input file does not exist: {}",
            input.display()
        )));
    }
    detect_format_from_path(input).map_err(|_| {
        Error::InvalidArgument(format!("input file is not a PDF document: {}", input.display()))
    })?;
    Ok(())
}

fn cmd_config(output: Option<&Path>) -> CliResult {
    let config = OcrConfig::template();
    match output {
        Some(path) => {
            config.save(path)?;
            println!("{} {}", "Wrote".green(), path.display());
        }
        None => println!("{}", config.to_json()?),
    }
    Ok(())
}

fn cmd_ocr(input: &Path, output: &Path, args: OcrArgs) -> CliResult {
    check_paths(input, output)?;

    let mut config = load_config(args.config.as_deref())?;
    if let Some(lang) = &args.lang {
        config.options.language = Some(lang.clone());
    }
    if let Some(zoom) = args.zoom {
        config.options.zoom = zoom;
    }
    if args.lazy_language_check {
        config.options.language_check = LanguageCheck::Lazy;
    }
    config.options.validate()?;

    let renderer = select_renderer(&config, &args)?;
    log::info!("rendering with {}, recognizing with {}", renderer.name(), config.tesseract.name());
    let pipeline = OcrPipeline::new(renderer, config.tesseract.clone()).with_options(config.options.clone());

    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap()
            .progress_chars("#>-"),
    );

    let result = pipeline.run_with_progress(input, output, |event: &PageEvent| {
        pb.set_length(event.total as u64);
        pb.set_message(format!("page {}: {}", event.index + 1, event.state));
        if event.state == PageState::Released {
            pb.inc(1);
        }
    });

    let report = match result {
        Ok(report) => report,
        Err(e) => {
            pb.abandon();
            return Err(e.into());
        }
    };
    pb.finish_with_message("Done!");

    println!(
        "{} {} ({} pages, language {})",
        "Saved".green().bold(),
        output.display(),
        report.page_count(),
        report.language.cyan()
    );
    Ok(())
}

#[cfg(not(feature = "pdfium"))]
fn select_renderer(config: &OcrConfig, _args: &OcrArgs) -> searchpdf::Result<Box<dyn PageRenderer>> {
    Ok(Box::new(config.renderer.clone()))
}

#[cfg(feature = "pdfium")]
fn select_renderer(config: &OcrConfig, args: &OcrArgs) -> searchpdf::Result<Box<dyn PageRenderer>> {
    if args.pdfium {
        let renderer = searchpdf::PdfiumRenderer::new()?.with_format(config.renderer.format);
        Ok(Box::new(renderer))
    } else {
        Ok(Box::new(config.renderer.clone()))
    }
}

fn cmd_languages(config: Option<&Path>) -> CliResult {
    let engine: TesseractEngine = load_config(config)?.tesseract;
    let languages = engine.installed_languages()?;

    println!("{}", "Installed OCR Languages".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());
    if languages.is_empty() {
        println!("{}", "(none)".yellow());
    }
    for lang in languages {
        println!("  {}", lang);
    }
    Ok(())
}

fn cmd_info(input: &Path) -> CliResult {
    let version = detect_format_from_path(input)?;
    let doc = PdfDocument::open(input)?;

    println!("{}", "Document Information".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());
    println!("{}: {}", "File".bold(), input.display());
    println!("{}: PDF {}", "Format".bold(), version);
    println!("{}: {}", "Pages".bold(), doc.page_count());
    match doc.language() {
        Some(lang) => {
            let ocr = searchpdf::language::to_tesseract(&lang)
                .unwrap_or_else(|| searchpdf::language::DEFAULT_LANGUAGE.to_string());
            println!("{}: {} (OCR: {})", "Language".bold(), lang, ocr);
        }
        None => println!(
            "{}: (none, OCR: {})",
            "Language".bold(),
            searchpdf::language::DEFAULT_LANGUAGE
        ),
    }

    println!();
    println!("{}", "Pages".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());
    for index in 0..doc.page_count() {
        let info = doc.page_info(index)?;
        let (width, height) = info.display_size();
        let b = info.crop_box;
        println!(
            "  {:>4}  [{} {} {} {}]  {:>6.1} x {:<6.1} {}",
            index + 1,
            b.left,
            b.bottom,
            b.right,
            b.top,
            width,
            height,
            info.rotation
        );
    }
    Ok(())
}

fn cmd_version() {
    println!("{} {}", "searchpdf".cyan().bold(), env!("CARGO_PKG_VERSION"));
    println!("Searchable PDF OCR tool");
    println!();
    println!("License: MIT");
}
