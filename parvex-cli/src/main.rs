use std::{
    error::Error,
    fmt::Display,
    io::Write,
    path::{Path, PathBuf},
    process::ExitCode,
};

use clap::{Parser, ValueEnum};
use parvex::{
    BacktrackResolver, DataFile, ParallelResolver, ParseGraph, ParseTree, RuntimeError,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Run a precompiled grammar over an input file", long_about = None)]
struct CommandLine {
    #[arg(required = true, help = "The compiled grammar data file")]
    data_file: PathBuf,
    #[arg(required = true, help = "The input text to parse")]
    input_file: PathBuf,
    #[arg(long, help = "Emit the first parse tree as nested JSON", conflicts_with = "dot")]
    json: bool,
    #[arg(long, help = "Emit the parse graph as GraphViz text (default)")]
    dot: bool,
    #[arg(
        long,
        value_enum,
        default_value_t = Resolver::Backtrack,
        help = "The resolver used for --json"
    )]
    resolver: Resolver,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Resolver {
    Backtrack,
    Parallel,
}

impl Display for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Resolver::Backtrack => write!(f, "backtrack"),
            Resolver::Parallel => write!(f, "parallel"),
        }
    }
}

#[derive(Debug)]
enum CliError {
    Io { file: PathBuf, error: std::io::Error },
    Runtime(RuntimeError),
}

impl Error for CliError {}

impl Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Io { file, error } => {
                write!(f, "failed to read {}: {}", file.display(), error)
            }
            CliError::Runtime(error) => write!(f, "{}", error),
        }
    }
}

impl From<RuntimeError> for CliError {
    fn from(error: RuntimeError) -> Self {
        CliError::Runtime(error)
    }
}

impl CliError {
    fn exit_code(&self) -> u8 {
        match self {
            CliError::Io { .. } => 2,
            CliError::Runtime(RuntimeError::InvalidDataFile(_)) => 2,
            CliError::Runtime(RuntimeError::InputRejected { .. }) => 1,
            CliError::Runtime(RuntimeError::NoParseTree) => 1,
        }
    }
}

fn main() -> ExitCode {
    let _ = color_eyre::install();
    env_logger::init();
    let cli = CommandLine::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("error: {}", error);
            ExitCode::from(error.exit_code())
        }
    }
}

fn run(cli: &CommandLine) -> Result<(), CliError> {
    let data = parvex::load_data_file(&cli.data_file)?;
    let input = read_input(&cli.input_file)?;
    let stream = parvex::run_pipeline(&data, &input)?;
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let emit_dot = cli.dot || !cli.json;
    if emit_dot {
        let graph = ParseGraph::build(&data, &stream);
        graph.write_dot(&mut out).map_err(|error| CliError::Io {
            file: PathBuf::from("<stdout>"),
            error,
        })?;
    } else {
        let trees = resolve(cli.resolver, &data, &stream)?;
        for tree in &trees {
            writeln!(out, "{}", tree.render_json()).map_err(|error| CliError::Io {
                file: PathBuf::from("<stdout>"),
                error,
            })?;
        }
    }
    Ok(())
}

fn resolve(
    resolver: Resolver,
    data: &DataFile,
    stream: &parvex::EdgeStream,
) -> Result<Vec<ParseTree>, CliError> {
    let trees = match resolver {
        Resolver::Backtrack => BacktrackResolver::new(data, stream)
            .resolve()
            .map_err(RuntimeError::from)?,
        Resolver::Parallel => {
            let resolution = ParallelResolver::new(data, stream)
                .resolve()
                .map_err(RuntimeError::from)?;
            if resolution.ambiguous {
                log::info!("input is ambiguous; reporting the first witness tree");
            }
            resolution.trees
        }
    };
    Ok(trees)
}

fn read_input(path: &Path) -> Result<String, CliError> {
    std::fs::read_to_string(path).map_err(|error| CliError::Io {
        file: path.to_path_buf(),
        error,
    })
}
