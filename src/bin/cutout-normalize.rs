use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, ValueEnum};
use image::imageops::FilterType;

use cutout_normalize::{
    codec, default_output_path, Mode, NormalizeOptions, Normalizer, ProcessResult,
    DEFAULT_MAX_PIXELS,
};

#[derive(Parser)]
#[command(
    name = "cutout-normalize",
    about = "Crop background-removed cutouts to their content and fill a square thumbnail",
    version,
    after_help = "Simple usage: cutout-normalize <image>  (writes {name}_256.png next to it)\n\n\
                  Input may also be a data URL (data:image/png;base64,...)."
)]
struct Cli {
    /// Input image file, directory, or data URL
    input: String,

    /// Output file or directory (default: {name}_256.png / {name}_cutout.png)
    #[arg(short, long)]
    output: Option<String>,

    /// Normalization mode: "fill256" (crop and cover) or "bgOnly" (re-encode only)
    #[arg(short, long, default_value = "fill256")]
    mode: Mode,

    /// Override the square side length used by fill mode
    #[arg(short, long)]
    size: Option<u32>,

    /// Reject images with more pixels than this
    #[arg(long, default_value_t = DEFAULT_MAX_PIXELS)]
    max_pixels: u64,

    /// Resampling filter used when shrinking
    #[arg(long, value_enum, default_value_t = Filter::Triangle)]
    filter: Filter,

    /// Print the result to stdout as a PNG data URL instead of writing a file
    #[arg(long)]
    data_url: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all non-error output
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum Filter {
    Nearest,
    Triangle,
    CatmullRom,
    Gaussian,
    Lanczos3,
}

impl From<Filter> for FilterType {
    fn from(filter: Filter) -> Self {
        match filter {
            Filter::Nearest => FilterType::Nearest,
            Filter::Triangle => FilterType::Triangle,
            Filter::CatmullRom => FilterType::CatmullRom,
            Filter::Gaussian => FilterType::Gaussian,
            Filter::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.quiet {
        "error"
    } else if cli.verbose {
        "info"
    } else {
        "warn"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let mode = match (cli.mode, cli.size) {
        (_, Some(0)) => {
            eprintln!("Error: Size must be greater than zero");
            process::exit(1);
        }
        (Mode::BgOnly, Some(_)) => {
            eprintln!("Error: --size only applies to fill mode");
            process::exit(1);
        }
        (Mode::Fill(_), Some(size)) => Mode::Fill(size),
        (mode, None) => mode,
    };

    let normalizer = Normalizer::new(NormalizeOptions {
        mode,
        max_pixels: cli.max_pixels,
        filter: cli.filter.into(),
    });

    if cli.input.starts_with("data:") || cli.data_url {
        run_single_in_memory(&normalizer, &cli);
        return;
    }

    let input_path = Path::new(&cli.input);
    if !input_path.exists() {
        eprintln!("Error: Input path does not exist: {}", cli.input);
        process::exit(1);
    }

    if !cli.quiet && cli.verbose {
        eprintln!("Mode: {mode}");
    }

    let results = if input_path.is_dir() {
        let output_dir = if let Some(o) = &cli.output {
            PathBuf::from(o)
        } else {
            eprintln!("Error: Output directory is required for batch processing");
            eprintln!("Usage: cutout-normalize <input_dir> -o <output_dir>");
            process::exit(1);
        };
        normalizer.process_directory(input_path, &output_dir)
    } else {
        let output_path = match &cli.output {
            Some(o) => PathBuf::from(o),
            None => default_output_path(input_path, mode),
        };
        vec![normalizer.process_file(input_path, &output_path)]
    };

    let mut success_count = 0u32;
    let mut fail_count = 0u32;

    for r in &results {
        print_result(r, &cli);
        if r.success {
            success_count += 1;
        } else {
            fail_count += 1;
        }
    }

    if results.len() > 1 && !cli.quiet {
        eprintln!();
        eprint!("[Summary] Processed: {success_count}");
        if fail_count > 0 {
            eprint!(", Failed: {fail_count}");
        }
        eprintln!(" (Total: {})", results.len());
    }

    if fail_count > 0 {
        process::exit(1);
    }
}

/// Handle a data URL input or `--data-url` output without touching the
/// directory machinery.
fn run_single_in_memory(normalizer: &Normalizer, cli: &Cli) {
    let bytes = if cli.input.starts_with("data:") {
        codec::from_data_url(&cli.input)
    } else {
        std::fs::read(&cli.input).map_err(Into::into)
    };

    let png = match bytes.and_then(|b| normalizer.normalize(&b)) {
        Ok(png) => png,
        Err(e) => {
            eprintln!("[FAIL] {e}");
            process::exit(1);
        }
    };

    if cli.data_url {
        let mut stdout = std::io::stdout().lock();
        if let Err(e) = writeln!(stdout, "{}", codec::to_data_url(&png)) {
            eprintln!("Error: Failed to write output: {e}");
            process::exit(1);
        }
        return;
    }

    let Some(output) = &cli.output else {
        eprintln!("Error: Data URL input needs --output or --data-url");
        process::exit(1);
    };
    if let Err(e) = std::fs::write(output, &png) {
        eprintln!("[FAIL] {output}: {e}");
        process::exit(1);
    }
    if !cli.quiet {
        eprintln!("[OK] {output}");
    }
}

fn print_result(result: &ProcessResult, cli: &Cli) {
    if cli.quiet && result.success {
        return;
    }

    let filename = result.path.file_name().map_or_else(
        || result.path.display().to_string(),
        |f| f.to_string_lossy().to_string(),
    );

    if result.success {
        match &result.output {
            Some(out) => eprintln!("[OK] {filename} -> {}", out.display()),
            None => eprintln!("[OK] {filename}"),
        }
    } else {
        eprintln!("[FAIL] {filename}: {}", result.message);
    }

    if cli.verbose && result.success && !result.message.is_empty() {
        eprintln!("  -> {}", result.message);
    }
}
