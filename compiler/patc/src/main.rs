//! Pat type checker CLI.
//!
//! Exit codes: 0 on success, 123 when type checking fails, 124 for an
//! invalid invocation or a parse failure - hosts disambiguate the failure
//! class without scraping text.

use patc::{check_file, report, CheckOptions, CheckReport, EXIT_TYPE_ERROR, EXIT_USAGE};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        print_usage();
        std::process::exit(EXIT_USAGE);
    }

    match args[1].as_str() {
        "check" => {
            if args.len() < 3 {
                eprintln!("Usage: pat check <file.pat> [-v|--verbose] [--json]");
                std::process::exit(EXIT_USAGE);
            }
            let (path, options, json) = parse_check_args(&args[2..]);
            let Some(path) = path else {
                eprintln!("error: missing file path");
                std::process::exit(EXIT_USAGE);
            };
            run_check(&path, &options, json);
        }
        "-h" | "--help" | "help" => {
            print_usage();
        }
        arg if arg.ends_with(".pat") => {
            // Shorthand: pat file.pat = pat check file.pat
            let (path, options, json) = parse_check_args(&args[1..]);
            let Some(path) = path else {
                eprintln!("error: missing file path");
                std::process::exit(EXIT_USAGE);
            };
            run_check(&path, &options, json);
        }
        cmd => {
            eprintln!("Unknown command: {cmd}");
            print_usage();
            std::process::exit(EXIT_USAGE);
        }
    }
}

fn parse_check_args(args: &[String]) -> (Option<String>, CheckOptions, bool) {
    let mut options = CheckOptions::default();
    let mut json = false;
    let mut path = None;

    for arg in args {
        match arg.as_str() {
            "-v" | "--verbose" => options.verbose = true,
            "--json" => json = true,
            other if !other.starts_with('-') && path.is_none() => {
                path = Some(other.to_string());
            }
            other => {
                eprintln!("Unknown option: {other}");
                std::process::exit(EXIT_USAGE);
            }
        }
    }

    (path, options, json)
}

fn run_check(path: &str, options: &CheckOptions, json: bool) {
    let report = match check_file(path, options) {
        Ok(report) => report,
        Err(err) => {
            eprintln!("[System Error] {err}");
            std::process::exit(EXIT_USAGE);
        }
    };

    if json {
        match serde_json::to_string_pretty(&report) {
            Ok(text) => println!("{text}"),
            Err(err) => {
                eprintln!("[System Error] cannot serialize report: {err}");
                std::process::exit(EXIT_USAGE);
            }
        }
        exit_for(&report);
    }

    if report.success {
        print!("{}", report::render_success(&report, options.verbose));
        std::process::exit(0);
    }

    eprint!("{}", report::render_failure(&report));
    exit_for(&report);
}

fn exit_for(report: &CheckReport) -> ! {
    if report.success {
        std::process::exit(0);
    }
    if report.is_parse_failure() {
        std::process::exit(EXIT_USAGE);
    }
    std::process::exit(EXIT_TYPE_ERROR);
}

fn print_usage() {
    eprintln!("Pat mailbox type checker");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  pat check <file.pat> [options]");
    eprintln!("  pat <file.pat>");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -v, --verbose    Print the resolved program before the final type");
    eprintln!("  --json           Print the structured report as JSON");
    eprintln!();
    eprintln!("Exit codes:");
    eprintln!("  0    type checking passed");
    eprintln!("  123  type checking failed");
    eprintln!("  124  invalid invocation or parse failure");
}
