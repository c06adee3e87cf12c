use std::fs::File;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::thread;

use anyhow::{anyhow, Context, Result};
use clap::Parser as ClapParser;
use clap::Subcommand;
use env_logger::Builder;
use log::{debug, info};
use memmap2::Mmap;

use rox as lox;

use lox::interpreter::{stack_size_for, Interpreter, DEFAULT_MAX_CALL_DEPTH};
use lox::scanner::Scanner;
use lox::token::Token;
use lox::{Lox, Report, EXIT_STATIC};

#[derive(ClapParser, Debug)]
#[command(
    version,
    about = "Lox language interpreter",
    long_about = None,
    args_conflicts_with_subcommands = true
)]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Script to run; starts a REPL when omitted
    file: Option<PathBuf>,

    /// Enable logging to app.log
    #[arg(long, global = true)]
    log: bool,

    /// Nested calls allowed before a stack overflow is reported
    #[arg(long, global = true, default_value_t = DEFAULT_MAX_CALL_DEPTH)]
    max_call_depth: usize,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tokenizes input from a file, printing each token
    Tokenize {
        filename: PathBuf,

        /// Print the token stream as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Maps `path` and copies it out as UTF‑8 text.
fn read_source(path: &Path) -> Result<String> {
    info!("Reading file: {:?}", path);
    let file = File::open(path).with_context(|| format!("Failed to open file {:?}", path))?;

    let len = file
        .metadata()
        .with_context(|| format!("Failed to stat file {:?}", path))?
        .len();

    // Zero-length files cannot be mapped.
    if len == 0 {
        return Ok(String::new());
    }

    // SAFETY: the mapping is read-only and copied before it is dropped.
    let map = unsafe { Mmap::map(&file) }.with_context(|| format!("Failed to map file {:?}", path))?;

    let text = std::str::from_utf8(&map).with_context(|| format!("{:?} is not valid UTF-8", path))?;

    info!("Read {} bytes from {:?}", len, path);
    Ok(text.to_owned())
}

fn init_logger() -> Result<()> {
    let log_file = File::create("app.log").context("Failed to create app.log")?;

    Builder::new()
        .format(|buf, record| {
            // Strip 'rox::' from module path
            let module = record
                .module_path()
                .unwrap_or("<unnamed>")
                .strip_prefix("rox::")
                .unwrap_or(record.module_path().unwrap_or("<unnamed>"));
            writeln!(
                buf,
                "[{}:{}] - {}",
                module,
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .filter(None, log::LevelFilter::Debug)
        .init();

    info!("Logger initialized, writing to app.log");
    Ok(())
}

/// Diagnostics go to stderr, warnings first.
fn emit(report: &Report) {
    for warning in &report.warnings {
        eprintln!("{}", warning);
    }
    for error in &report.errors {
        eprintln!("{}", error);
    }
    if let Some(error) = &report.runtime_error {
        eprintln!("{}", error);
    }
}

fn tokenize(filename: &Path, json: bool) -> Result<i32> {
    let source = read_source(filename)?;
    let mut tokens: Vec<Token> = Vec::new();
    let mut failed = false;

    for token in Scanner::new(&source) {
        match token {
            Ok(token) => {
                debug!("Scanned token: {}", token);
                tokens.push(token);
            }
            Err(e) => {
                failed = true;
                eprintln!("{}", e);
            }
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&tokens)?);
    } else {
        for token in &tokens {
            println!("{}", token);
        }
    }

    Ok(if failed { EXIT_STATIC } else { 0 })
}

fn run_file(lox: &mut Lox, path: &Path) -> Result<i32> {
    let source = read_source(path)?;
    let report = lox.run(&source);
    emit(&report);
    Ok(report.exit_code())
}

/// One run per line against the same session; stops on `exit` or EOF.
fn repl(lox: &mut Lox) -> Result<i32> {
    let stdin = io::stdin();
    let mut line = String::new();

    loop {
        print!("> ");
        io::stdout().flush()?;

        line.clear();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }

        let input = line.trim_end();
        if input == "exit" {
            break;
        }

        let report = lox.run(input);
        debug!("REPL line finished with code {}", report.exit_code());
        emit(&report);
    }

    Ok(0)
}

/// Runs `file` (or the REPL) on a thread whose stack fits `max_call_depth`
/// nested Lox calls.
fn interpret(file: Option<PathBuf>, max_call_depth: usize) -> Result<i32> {
    let stack_size = stack_size_for(max_call_depth);
    debug!("Interpreter thread stack: {} bytes", stack_size);

    let handle = thread::Builder::new()
        .name("interpreter".into())
        .stack_size(stack_size)
        .spawn(move || -> Result<i32> {
            let interpreter = Interpreter::new().with_max_call_depth(max_call_depth);
            let mut lox = Lox::from_interpreter(interpreter);

            match file {
                Some(path) => run_file(&mut lox, &path),
                None => repl(&mut lox),
            }
        })
        .context("Failed to spawn interpreter thread")?;

    handle
        .join()
        .map_err(|_| anyhow!("Interpreter thread panicked"))?
}

fn main() -> Result<()> {
    let args: Cli = Cli::parse();

    if args.log {
        init_logger()?;
    } else {
        Builder::new().filter_level(log::LevelFilter::Off).init();
    }

    info!("CLI arguments: {:?}", args);

    let code = match (args.command, args.file) {
        (Some(Commands::Tokenize { filename, json }), _) => tokenize(&filename, json)?,
        (None, file) => interpret(file, args.max_call_depth)?,
    };

    if code != 0 {
        debug!("Exiting with code {}", code);
        std::process::exit(code);
    }

    Ok(())
}
