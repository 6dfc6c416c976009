use rowalign::{AlignOptions, Alignment, Graph};
use serde::Serialize;
use std::io::Read;
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
enum CliError {
    Usage(&'static str),
    Io(std::io::Error),
    Align(rowalign::Error),
    Json(serde_json::Error),
    Config(String),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Usage(msg) => write!(f, "{msg}"),
            CliError::Io(err) => write!(f, "I/O error: {err}"),
            CliError::Align(err) => write!(f, "{err}"),
            CliError::Json(err) => write!(f, "JSON error: {err}"),
            CliError::Config(msg) => write!(f, "config error: {msg}"),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<rowalign::Error> for CliError {
    fn from(value: rowalign::Error) -> Self {
        Self::Align(value)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

#[derive(Debug, Clone, Copy, Default)]
enum Command {
    #[default]
    Solve,
    Validate,
}

#[derive(Debug, Default)]
struct Args {
    command: Command,
    input: Option<String>,
    pretty: bool,
    positions: bool,
    verbose: bool,
    config: Option<String>,
    max_rounds: Option<usize>,
    quiet_rounds: Option<usize>,
    allow_unconverged: bool,
}

#[derive(Serialize)]
struct ValidateOut {
    rows: usize,
    nodes: usize,
}

#[derive(Serialize)]
struct SolveOut<'a> {
    #[serde(flatten)]
    alignment: &'a Alignment,
    #[serde(skip_serializing_if = "Option::is_none")]
    positions: Option<Vec<Vec<f64>>>,
}

fn usage() -> &'static str {
    "rowalign-cli\n\
\n\
USAGE:\n\
  rowalign-cli [solve] [--pretty] [--positions] [--config <path>] [--max-rounds <n>] [--quiet-rounds <n>] [--allow-unconverged] [--verbose] [<path>|-]\n\
  rowalign-cli validate [--pretty] [--verbose] [<path>|-]\n\
\n\
NOTES:\n\
  - If <path> is omitted or '-', input is read from stdin.\n\
  - Input is a JSON array of rows; each row is an array of {\"kind\": \"box\"|\"point\", \"above\", \"below\", \"partners\"}.\n\
  - --config reads a JSON object with optional `solver` and `project` sections.\n\
  - Logging follows RUST_LOG (default `warn`); --verbose enables `rowalign=debug`.\n\
"
}

fn parse_count<'a>(it: &mut impl Iterator<Item = &'a String>) -> Result<usize, CliError> {
    let Some(raw) = it.next() else {
        return Err(CliError::Usage(usage()));
    };
    match raw.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(CliError::Usage(usage())),
    }
}

fn parse_args(argv: &[String]) -> Result<Args, CliError> {
    let mut args = Args::default();

    let mut it = argv.iter().skip(1);
    while let Some(a) = it.next() {
        match a.as_str() {
            "--help" | "-h" => return Err(CliError::Usage(usage())),
            "solve" => args.command = Command::Solve,
            "validate" => args.command = Command::Validate,
            "--pretty" => args.pretty = true,
            "--positions" => args.positions = true,
            "--verbose" | "-v" => args.verbose = true,
            "--allow-unconverged" => args.allow_unconverged = true,
            "--config" => {
                let Some(path) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.config = Some(path.clone());
            }
            "--max-rounds" => args.max_rounds = Some(parse_count(&mut it)?),
            "--quiet-rounds" => args.quiet_rounds = Some(parse_count(&mut it)?),
            "--" => {
                if let Some(rest) = it.next() {
                    if args.input.is_some() {
                        return Err(CliError::Usage(usage()));
                    }
                    args.input = Some(rest.clone());
                }
                if it.next().is_some() {
                    return Err(CliError::Usage(usage()));
                }
            }
            "-" => {
                if args.input.is_some() {
                    return Err(CliError::Usage(usage()));
                }
                args.input = Some("-".to_string());
            }
            other if other.starts_with('-') => return Err(CliError::Usage(usage())),
            path => {
                if args.input.is_some() {
                    return Err(CliError::Usage(usage()));
                }
                args.input = Some(path.to_string());
            }
        }
    }

    Ok(args)
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("rowalign=debug,rowalign_cli=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    // Keeps an already-installed subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn read_input(input: Option<&str>) -> Result<String, CliError> {
    match input {
        None | Some("-") => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
        Some(path) => Ok(std::fs::read_to_string(path)?),
    }
}

fn write_json(value: &impl Serialize, pretty: bool) -> Result<(), CliError> {
    if pretty {
        serde_json::to_writer_pretty(std::io::stdout().lock(), value)?;
    } else {
        serde_json::to_writer(std::io::stdout().lock(), value)?;
    }
    println!();
    Ok(())
}

fn load_options(args: &Args) -> Result<AlignOptions, CliError> {
    let mut opts = match args.config.as_deref() {
        None => AlignOptions::default(),
        Some(path) => {
            let text = std::fs::read_to_string(path)?;
            serde_json::from_str::<AlignOptions>(&text)
                .map_err(|err| CliError::Config(format!("{path}: {err}")))?
        }
    };
    if let Some(n) = args.max_rounds {
        opts.solver.max_rounds = n;
    }
    if let Some(n) = args.quiet_rounds {
        opts.solver.quiet_rounds = n;
    }
    if args.allow_unconverged {
        opts.solver.allow_unconverged = true;
    }
    opts.validate()?;
    Ok(opts)
}

fn run(args: Args) -> Result<(), CliError> {
    let text = read_input(args.input.as_deref())?;

    match args.command {
        Command::Validate => {
            let graph = Graph::from_json_str(&text)?;
            write_json(
                &ValidateOut {
                    rows: graph.row_count(),
                    nodes: graph.node_count(),
                },
                args.pretty,
            )
        }
        Command::Solve => {
            let opts = load_options(&args)?;
            let mut graph = Graph::from_json_str(&text)?;
            let alignment = graph.align(&opts)?;
            if !alignment.report.converged {
                tracing::warn!(
                    rounds = alignment.report.rounds,
                    shift = alignment.report.final_shift,
                    "layout did not converge; writing the unsettled result"
                );
            }
            write_json(
                &SolveOut {
                    alignment: &alignment,
                    positions: args.positions.then(|| graph.positions()),
                },
                args.pretty,
            )
        }
    }
}

fn main() {
    let args = match parse_args(&std::env::args().collect::<Vec<_>>()) {
        Ok(v) => v,
        Err(CliError::Usage(msg)) => {
            eprintln!("{msg}");
            std::process::exit(2);
        }
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    };

    init_tracing(args.verbose);

    if let Err(err) = run(args) {
        eprintln!("{err}");
        std::process::exit(1);
    }
}
