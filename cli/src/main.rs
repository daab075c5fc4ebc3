//! probsheet CLI - worksheet builder for textbook PDFs

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use probsheet::{
    AnalyzeOptions, RenderOptions, Strategy, TypesetOptions, Worksheet, DEFAULT_TITLE,
};

#[derive(Parser)]
#[command(name = "probsheet")]
#[command(version)]
#[command(about = "Build practice worksheets from the problem sections of a PDF", long_about = None)]
struct Cli {
    /// Input PDF file
    #[arg(value_name = "FILE")]
    input: Option<PathBuf>,

    /// Output PDF (defaults to <FILE stem>_worksheet.pdf)
    #[arg(value_name = "OUTPUT")]
    output: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List the problem sections found in a PDF
    Analyze {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Print the detected spans as JSON
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        analysis: AnalysisArgs,
    },

    /// Analyze a PDF and write the worksheet
    Render {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output PDF file
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,

        /// Worksheet title
        #[arg(long, default_value = DEFAULT_TITLE)]
        title: String,

        /// How questions are reproduced
        #[arg(long, value_enum, default_value = "geometric")]
        strategy: StrategyArg,

        /// Blank space after each section, in points
        #[arg(long, default_value = "198")]
        answer_space: f32,

        /// Extra space between sections, in points
        #[arg(long, default_value = "28")]
        section_gap: f32,

        /// Output page margin, in points
        #[arg(long, default_value = "36")]
        margin: f32,

        /// Space kept above each section header, in points
        #[arg(long, default_value = "10")]
        lookback: f32,

        /// Running header skipped on continuation pages, in points from the top
        #[arg(long, default_value = "50")]
        running_header: f32,

        /// Running footer skipped on continuation pages, in points from the bottom
        #[arg(long, default_value = "40")]
        running_footer: f32,

        /// TeX engine for the typeset strategy
        #[arg(long, env = "PROBSHEET_TEX_ENGINE", default_value = "pdflatex")]
        engine: String,

        /// Seconds allowed for each engine run
        #[arg(long, env = "PROBSHEET_TEX_TIMEOUT", default_value = "30")]
        timeout: u64,

        /// Fail on characters the typeset strategy cannot render
        #[arg(long)]
        strict: bool,

        #[command(flatten)]
        analysis: AnalysisArgs,
    },

    /// Show version information
    Version,
}

#[derive(Args)]
struct AnalysisArgs {
    /// Vertical tolerance for grouping words into lines, in points
    #[arg(long, default_value = "3")]
    tolerance: f32,

    /// Space kept below the last question of a section, in points
    #[arg(long, default_value = "20")]
    padding: f32,

    /// Farthest a continuation line may sit below its question, in points
    #[arg(long, value_name = "POINTS")]
    continuation_limit: Option<f32>,
}

impl AnalysisArgs {
    fn options(&self) -> AnalyzeOptions {
        let options = AnalyzeOptions::new()
            .with_line_tolerance(self.tolerance)
            .with_end_padding(self.padding);
        match self.continuation_limit {
            Some(limit) => options.with_continuation_limit(limit),
            None => options,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum StrategyArg {
    /// Crop question regions from the source pages
    Geometric,
    /// Re-typeset question text with a TeX engine
    Typeset,
}

impl From<StrategyArg> for Strategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Geometric => Strategy::Geometric,
            StrategyArg::Typeset => Strategy::Typeset,
        }
    }
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Some(Commands::Analyze {
            input,
            json,
            analysis,
        }) => cmd_analyze(&input, json, &analysis),
        Some(Commands::Render {
            input,
            output,
            title,
            strategy,
            answer_space,
            section_gap,
            margin,
            lookback,
            running_header,
            running_footer,
            engine,
            timeout,
            strict,
            analysis,
        }) => {
            let mut typeset = TypesetOptions::new()
                .with_engine(engine)
                .with_timeout(Duration::from_secs(timeout));
            if strict {
                typeset = typeset.strict();
            }
            let render_options = RenderOptions::new()
                .with_strategy(strategy.into())
                .with_answer_space(answer_space)
                .with_section_gap(section_gap)
                .with_margin(margin)
                .with_header_lookback(lookback)
                .with_running_bands(running_header, running_footer)
                .with_typeset(typeset);
            cmd_render(&input, &output, &title, analysis.options(), render_options)
        }
        Some(Commands::Version) => {
            cmd_version();
            Ok(())
        }
        None => {
            // Default behavior: build a worksheet if input is provided
            if let Some(input) = cli.input {
                let output = cli.output.unwrap_or_else(|| default_output(&input));
                cmd_render(
                    &input,
                    &output,
                    DEFAULT_TITLE,
                    AnalyzeOptions::default(),
                    RenderOptions::default(),
                )
            } else {
                println!("{}", "Usage: probsheet <FILE> [OUTPUT]".yellow());
                println!("       probsheet --help for more information");
                Ok(())
            }
        }
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        if let Some(hint) = e
            .downcast_ref::<probsheet::Error>()
            .and_then(probsheet::Error::hint)
        {
            eprintln!("{}: {}", "Hint".yellow(), hint);
        }
        std::process::exit(1);
    }
}

fn default_output(input: &Path) -> PathBuf {
    let stem = input.file_stem().unwrap_or_default().to_string_lossy();
    input.with_file_name(format!("{}_worksheet.pdf", stem))
}

fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_message(message.to_string());
    pb
}

fn cmd_analyze(
    input: &Path,
    json: bool,
    analysis: &AnalysisArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut sheet = Worksheet::new().with_analyze_options(analysis.options());
    let summaries = sheet.analyze(input)?;

    if json {
        println!("{}", serde_json::to_string_pretty(sheet.spans())?);
        return Ok(());
    }

    println!("{}", "Problem Sections".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());
    if sheet.spans().is_empty() {
        for line in summaries {
            println!("{}", line.yellow());
        }
        return Ok(());
    }

    let total: usize = sheet.spans().iter().map(|s| s.question_count).sum();
    for summary in sheet.summaries() {
        let count = format!("({} questions, {})", summary.question_count, summary.page_range());
        let count = if summary.question_count == 0 {
            count.yellow()
        } else {
            count.dimmed()
        };
        println!("  {} {}", summary.title.bold(), count);
    }
    println!();
    println!(
        "{} {} sections, {} questions",
        "Found".green().bold(),
        sheet.spans().len(),
        total
    );

    Ok(())
}

fn cmd_render(
    input: &Path,
    output: &Path,
    title: &str,
    analyze_options: AnalyzeOptions,
    render_options: RenderOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut sheet = Worksheet::new()
        .with_analyze_options(analyze_options)
        .with_render_options(render_options);

    let pb = spinner("Analyzing PDF...");
    let summaries = sheet.analyze(input);
    pb.finish_and_clear();
    for line in summaries? {
        println!("  {} {}", "├─".dimmed(), line);
    }

    let pb = spinner("Building worksheet...");
    let report = sheet.render(output, title);
    pb.finish_and_clear();
    let report = report?;

    let pages = report
        .page_count
        .map(|n| format!("{} pages", n))
        .unwrap_or_else(|| "typeset".to_string());
    println!(
        "\n{} {} ({}, {} sections)",
        "Saved to".green().bold(),
        report.output.display(),
        pages,
        report.section_count
    );

    Ok(())
}

fn cmd_version() {
    println!("{} {}", "probsheet".cyan().bold(), env!("CARGO_PKG_VERSION"));
    println!("Worksheet builder for textbook PDFs");
}
