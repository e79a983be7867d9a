// Version information constants
const VERSION: &str = env!("CARGO_PKG_VERSION");

use std::error::Error;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Instant;

use clap::{Args, Parser, Subcommand};

mod data;
mod error;
mod heatmap;
mod html;
mod progress;
mod scale;
mod scatter;
mod svg;
mod venn;
mod view;

use data::{DataBundle, RenderAs};
use view::{CorrMethod, CorrView, PlotConfig};

/// Logger manager supporting dynamic progress display and detailed logging
pub struct Logger {
    writer: BufWriter<std::fs::File>,
    last_progress: String,
}

impl Logger {
    pub fn new(file: std::fs::File) -> Self {
        Self {
            writer: BufWriter::new(file),
            last_progress: String::new(),
        }
    }

    /// Record detailed log information
    pub fn log(&mut self, message: &str) -> std::io::Result<()> {
        let timestamp = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S");
        writeln!(self.writer, "[{}] {}", timestamp, message)?;
        self.writer.flush()?;
        Ok(())
    }

    /// Display dynamic progress information (overwrite previous line)
    pub fn progress(&mut self, message: &str) -> std::io::Result<()> {
        if !self.last_progress.is_empty() {
            print!("\r{}", " ".repeat(self.last_progress.len()));
        }
        print!("\r{}", message);
        std::io::stdout().flush()?;
        self.last_progress = message.to_string();
        Ok(())
    }

    /// Finish progress display
    pub fn finish_progress(&mut self) -> std::io::Result<()> {
        if !self.last_progress.is_empty() {
            println!();
            self.last_progress.clear();
        }
        Ok(())
    }

    /// Record log and display progress simultaneously
    pub fn log_and_progress(&mut self, message: &str) -> std::io::Result<()> {
        self.log(message)?;
        self.progress(message)?;
        Ok(())
    }
}

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render the correlation heatmap, scatter and overlap panels as SVG
    Render(RenderArgs),
    /// Export the derived correlation pair table as CSV
    Pairs(PairsArgs),
}

#[derive(Args)]
struct RenderArgs {
    /// Input JSON data bundle path
    #[arg(short = 'i', long = "input")]
    pub input: String,
    /// Output directory for the panel files
    #[arg(short = 'o', long = "output")]
    pub output: String,
    /// Plot configuration TOML path (optional)
    #[arg(short = 'c', long = "config")]
    pub config: Option<String>,
    /// Correlation method (pearson or spearman)
    #[arg(short = 'm', long = "method", default_value = "pearson")]
    pub method: String,
    /// Render the post-hover state for one pair, as X:Y phenotype ids
    #[arg(short = 'f', long = "focus")]
    pub focus: Option<String>,
    /// Also write a self-contained interactive corrplot.html
    #[arg(long = "html")]
    pub html: bool,
    /// Log file path (optional)
    #[arg(short = 'l', long = "log")]
    pub log: Option<String>,
}

#[derive(Args)]
struct PairsArgs {
    /// Input JSON data bundle path
    #[arg(short = 'i', long = "input")]
    pub input: String,
    /// Output CSV path
    #[arg(short = 'o', long = "output")]
    pub output: String,
    /// Log file path (optional)
    #[arg(short = 'l', long = "log")]
    pub log: Option<String>,
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Render(args) => {
            // Validate render command parameters
            validate_render_args(&args)?;

            // Set up log file
            let log_file = if let Some(log_path) = &args.log {
                std::fs::File::create(log_path)?
            } else {
                std::fs::File::create("render.log")?
            };
            let mut logger = Logger::new(log_file);

            // Record environment information and parameters
            logger.log("=== PhenoCorr Render Function Log ===")?;
            logger.log(&format!("Software Version: v{}", VERSION))?;
            logger.log(&format!(
                "Runtime: {}",
                chrono::Utc::now().format("%Y-%m-%d %H:%M:%S")
            ))?;
            logger.log(&format!("Bundle File: {}", args.input))?;
            logger.log(&format!("Output Directory: {}", args.output))?;
            logger.log(&format!("Correlation Method: {}", args.method))?;

            let result = run_render(&args, &mut logger);

            match &result {
                Ok(_) => logger.log("Panel rendering completed")?,
                Err(e) => logger.log(&format!("Panel rendering failed: {}", e))?,
            }

            result
        }
        Commands::Pairs(args) => {
            // Validate pairs command parameters
            validate_pairs_args(&args)?;

            let log_file = if let Some(log_path) = &args.log {
                std::fs::File::create(log_path)?
            } else {
                std::fs::File::create("pairs.log")?
            };
            let mut logger = Logger::new(log_file);

            logger.log("=== PhenoCorr Pairs Function Log ===")?;
            logger.log(&format!("Software Version: v{}", VERSION))?;
            logger.log(&format!("Bundle File: {}", args.input))?;
            logger.log(&format!("Output File: {}", args.output))?;

            let result = run_pairs(&args, &mut logger);

            match &result {
                Ok(_) => logger.log("Pair export completed")?,
                Err(e) => logger.log(&format!("Pair export failed: {}", e))?,
            }

            result
        }
    }
}

fn run_render(args: &RenderArgs, logger: &mut Logger) -> Result<(), Box<dyn Error>> {
    let start_time = Instant::now();
    let method: CorrMethod = args.method.parse()?;

    println!("[Processing] Loading data bundle: {}", args.input);
    logger.log_and_progress("Loading data bundle...")?;
    let config = PlotConfig::load(args.config.as_deref().map(Path::new))?;
    let bundle = DataBundle::from_json_file(Path::new(&args.input))?;

    logger.log_and_progress("Building linked views...")?;
    let mut view = CorrView::new(config, bundle)?;
    view.render();
    if method != CorrMethod::Pearson {
        view.change_corr_method(method);
    }
    logger.log(&format!(
        "Derived {} ordered pairs from {} phenotypes",
        view.pairs().len(),
        view.bundle().axis_count()
    ))?;

    if let Some(focus) = &args.focus {
        let (x_id, y_id) = parse_focus(focus)?;
        logger.log(&format!("Focus pair: {} vs {}", x_id, y_id))?;
        view.hover_pair(x_id, y_id)?;
    }
    logger.finish_progress()?;

    std::fs::create_dir_all(&args.output)?;
    let heatmap_path = format!("{}/heatmap.svg", args.output);
    let scatter_path = format!("{}/scatter.svg", args.output);
    let venn_path = format!("{}/venn.svg", args.output);
    std::fs::write(&heatmap_path, view.heatmap_svg())?;
    std::fs::write(&scatter_path, view.scatter_svg())?;
    std::fs::write(&venn_path, view.venn_svg())?;
    logger.log(&format!("SVG panels written: {}", args.output))?;

    if args.html {
        println!("[Processing] Prerendering interactive page");
        logger.log("Prerendering interactive page...")?;
        let page = html::interactive_page(&view)?;
        let html_path = format!("{}/corrplot.html", args.output);
        std::fs::write(&html_path, page)?;
        logger.log(&format!("Interactive page written: {}", html_path))?;
    }

    println!("\r[Output] Panels: {}", args.output);
    println!("{}", progress::format_time_used(start_time.elapsed()));
    Ok(())
}

fn run_pairs(args: &PairsArgs, logger: &mut Logger) -> Result<(), Box<dyn Error>> {
    let start_time = Instant::now();

    println!("[Processing] Loading data bundle: {}", args.input);
    logger.log_and_progress("Loading data bundle...")?;
    let bundle = DataBundle::from_json_file(Path::new(&args.input))?;
    bundle.validate()?;
    let pairs = bundle.derive_pairs();
    logger.log(&format!("Derived {} ordered pairs", pairs.len()))?;
    logger.finish_progress()?;

    let file = std::fs::File::create(&args.output)?;
    let mut writer = BufWriter::new(file);
    writeln!(writer, "x_id,y_id,x_label,y_label,pearson,spearman,render_as")?;
    for pair in &pairs {
        writeln!(
            writer,
            "{},{},{},{},{},{},{}",
            csv_field(&pair.x_id),
            csv_field(&pair.y_id),
            csv_field(&pair.x_label),
            csv_field(&pair.y_label),
            pair.pearson,
            pair.spearman,
            match pair.render_as {
                RenderAs::Circle => "circle",
                RenderAs::Label => "label",
            }
        )?;
    }
    writer.flush()?;

    println!("\r[Output] Pairs: {}", args.output);
    println!("{}", progress::format_time_used(start_time.elapsed()));
    Ok(())
}

/// Validate render command parameters
fn validate_render_args(args: &RenderArgs) -> Result<(), Box<dyn Error>> {
    if args.input.trim().is_empty() {
        return Err("Error: Input bundle path cannot be empty".into());
    }
    if !Path::new(&args.input).exists() {
        return Err(format!("Error: Input bundle does not exist: {}", args.input).into());
    }
    if !args.input.ends_with(".json") {
        return Err(format!("Error: Input bundle must end with .json: {}", args.input).into());
    }

    if args.output.trim().is_empty() {
        return Err("Error: Output directory cannot be empty".into());
    }

    args.method.parse::<CorrMethod>()?;

    if let Some(config) = &args.config {
        if !Path::new(config).exists() {
            return Err(format!("Error: Config file does not exist: {}", config).into());
        }
    }
    if let Some(focus) = &args.focus {
        parse_focus(focus)?;
    }
    Ok(())
}

/// Validate pairs command parameters
fn validate_pairs_args(args: &PairsArgs) -> Result<(), Box<dyn Error>> {
    if args.input.trim().is_empty() {
        return Err("Error: Input bundle path cannot be empty".into());
    }
    if !Path::new(&args.input).exists() {
        return Err(format!("Error: Input bundle does not exist: {}", args.input).into());
    }
    if !args.input.ends_with(".json") {
        return Err(format!("Error: Input bundle must end with .json: {}", args.input).into());
    }

    if args.output.trim().is_empty() {
        return Err("Error: Output CSV path cannot be empty".into());
    }
    if !args.output.ends_with(".csv") {
        return Err(format!("Error: Output path must end with .csv: {}", args.output).into());
    }
    Ok(())
}

/// Splits a focus argument of the form "X:Y" into the two phenotype ids.
fn parse_focus(focus: &str) -> Result<(&str, &str), Box<dyn Error>> {
    match focus.split_once(':') {
        Some((x, y)) if !x.is_empty() && !y.is_empty() => Ok((x, y)),
        _ => Err(format!("Error: Focus must be given as X:Y phenotype ids: {}", focus).into()),
    }
}

fn csv_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
