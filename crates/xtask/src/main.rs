mod cmd;

#[derive(Debug, thiserror::Error)]
enum XtaskError {
    #[error("usage: xtask <command> ...")]
    Usage,
    #[error("unknown command: {0}")]
    UnknownCommand(String),
    #[error("invalid value for {flag}: {value}")]
    InvalidValue { flag: String, value: String },
    #[error("failed to read file {path}: {source}")]
    ReadFile {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to process JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Remora(#[from] remora::Error),
    #[error("reference renderer `{0}` is not available (is it on PATH?)")]
    ReferenceUnavailable(String),
    #[error("deviation check failed: {0}")]
    Threshold(#[from] remora::fidelity::ThresholdViolation),
}

fn print_help(topic: Option<&str>) {
    match topic.map(str::trim) {
        Some("deviation-suite") => {
            println!(
                "usage: xtask deviation-suite [--samples DIR] [--candidate-dir DIR | --candidate-cmd PROG]"
            );
            println!(
                "                             [--reference-cmd PROG | --reference-dir DIR] [--max-samples N]"
            );
            println!("                             [--items] [--check]");
        }
        Some("compare-svgs") => {
            println!(
                "usage: xtask compare-svgs <candidate.svg> <reference.svg> [--simple] [--threshold N]"
            );
        }
        Some("post-process") => {
            println!(
                "usage: xtask post-process <in.svg> [--margin M] [--no-viewbox] [--normalize-origin]"
            );
            println!(
                "                          [--width W] [--height H] [--max-width W] [--max-height H] [--auto-size]"
            );
        }
        Some("measure-text") => {
            println!(
                "usage: xtask measure-text <text> [--font-size N] [--font-family F] [--font-weight W]"
            );
            println!("                          [--calibration FILE] [--deterministic]");
        }
        Some("calibrate-text") => {
            println!(
                "usage: xtask calibrate-text <samples.json> [--base calibration.json] [--version LABEL]"
            );
        }
        Some("compare-profiles") => {
            println!("usage: xtask compare-profiles <reference.json> <candidate.json>");
        }
        _ => {
            println!("usage: xtask <command> ...");
            println!();
            println!("Commands:");
            println!("  deviation-suite");
            println!("  compare-svgs");
            println!("  post-process");
            println!("  measure-text");
            println!("  calibrate-text");
            println!("  compare-profiles");
            println!();
            println!("Settings are read from REMORA_* environment variables (e.g. REMORA_FONT_PATH,");
            println!("REMORA_MAX_SAMPLES). Logging follows RUST_LOG.");
            println!();
            println!("Topics:");
            println!("  xtask help <command>");
        }
    }
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> Result<(), XtaskError> {
    init_tracing();

    let mut args = std::env::args().skip(1);
    let Some(cmd_name) = args.next() else {
        return Err(XtaskError::Usage);
    };

    if matches!(cmd_name.as_str(), "--help" | "-h") {
        print_help(None);
        return Ok(());
    }
    if cmd_name == "help" {
        print_help(args.next().as_deref());
        return Ok(());
    }

    match cmd_name.as_str() {
        "deviation-suite" => cmd::deviation_suite(args.collect()),
        "compare-svgs" => cmd::compare_svgs(args.collect()),
        "post-process" => cmd::post_process(args.collect()),
        "measure-text" => cmd::measure_text(args.collect()),
        "calibrate-text" => cmd::calibrate_text(args.collect()),
        "compare-profiles" => cmd::compare_profiles(args.collect()),
        other => Err(XtaskError::UnknownCommand(other.to_string())),
    }
}
