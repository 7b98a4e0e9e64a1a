use clap::Parser;
use copper_mask::{load_board, load_board_bytes, run, BoardFormat, ExportOptions};
use std::io::Read;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "copper-mask",
    about = "Export one copper layer of a KiCad board as a filled-polygon SVG"
)]
struct Cli {
    /// Input board (.kicad_pcb or .zip); `-` reads from stdin
    input: PathBuf,

    /// Layer to export (canonical or user name)
    #[arg(short, long, default_value = "F.Cu")]
    layer: String,

    /// Include copper zones (pours)
    #[arg(long)]
    zones: bool,

    /// Maximum arc flattening error in mm
    #[arg(long, default_value_t = 0.02)]
    max_error: f64,

    /// Blank margin around the copper in mm
    #[arg(long, default_value_t = 1.0)]
    margin: f64,

    /// Fill colour of the copper paths
    #[arg(long, default_value = "#000000")]
    fill: String,

    /// Suffix of the output file name
    #[arg(long, default_value = "_laser.svg")]
    suffix: String,

    /// Output SVG file (next to the board if not specified)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Override auto-detected format (kicad, zip)
    #[arg(short, long)]
    format: Option<String>,

    /// Print the export report as JSON
    #[arg(long)]
    json: bool,
}

fn parse_format(s: &str) -> Result<BoardFormat, String> {
    match s.to_lowercase().as_str() {
        "kicad" => Ok(BoardFormat::KiCad),
        "zip" => Ok(BoardFormat::Archive),
        _ => Err(format!("Unknown format: {s}. Use: kicad, zip")),
    }
}

fn fail(msg: impl std::fmt::Display) -> ! {
    eprintln!("Error: {msg}");
    std::process::exit(1);
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let opts = ExportOptions {
        layer: cli.layer,
        include_zones: cli.zones,
        max_error_mm: cli.max_error,
        margin_mm: cli.margin,
        fill_color: cli.fill,
        suffix: cli.suffix,
    };

    let from_stdin = cli.input.as_os_str() == "-";
    if from_stdin && cli.output.is_none() {
        fail("reading from stdin needs an explicit --output");
    }

    let board = if from_stdin || cli.format.is_some() {
        let format = match cli.format.as_deref().map(parse_format) {
            Some(Ok(f)) => f,
            Some(Err(e)) => fail(e),
            None => BoardFormat::KiCad,
        };
        let read = if from_stdin {
            let mut buf = Vec::new();
            std::io::stdin().read_to_end(&mut buf).map(|_| buf)
        } else {
            std::fs::read(&cli.input)
        };
        let data = match read {
            Ok(d) => d,
            Err(e) => fail(format!("reading input: {e}")),
        };
        let source = (!from_stdin).then_some(cli.input.as_path());
        load_board_bytes(&data, format, source)
    } else {
        load_board(&cli.input)
    };

    let board = match board {
        Ok(b) => b,
        Err(e) => fail(e),
    };

    match run(&board, &opts, cli.output.as_deref()) {
        Ok(report) => {
            if cli.json {
                match serde_json::to_string_pretty(&report) {
                    Ok(json) => println!("{json}"),
                    Err(e) => fail(e),
                }
            } else {
                println!("[OK] Wrote: {}", report.output.display());
                println!("Layer: {} | Zones included: {}", report.layer, report.zones_included);
                if report.items_skipped > 0 {
                    println!("Skipped {} items that could not be converted", report.items_skipped);
                }
            }
        }
        Err(e) => fail(e),
    }
}
