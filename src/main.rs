use std::path::PathBuf;
use std::process;

use clap::Parser;
use color_eyre::eyre::Result;
use log::LevelFilter;
use simple_logger::SimpleLogger;

use ls8::memory::parse::LoadError;
use ls8::memory::StdMem;
use ls8::processor::Processor;

/// Usage errors, malformed images, and runtime faults.
const EXIT_USAGE: i32 = 1;
/// The program image could not be read.
const EXIT_MISSING: i32 = 2;
/// The program image contained no instructions.
const EXIT_EMPTY: i32 = 3;

/// Run an LS8 program image.
#[derive(Parser)]
#[command(version)]
struct Args {
    /// `.ls8` program image to load and run
    image: PathBuf,
}

fn main() -> Result<()> {
    color_eyre::install()?; // rust error handling
    SimpleLogger::new()
        .with_level(LevelFilter::Warn)
        .env()
        .init()
        .unwrap(); // logging, RUST_LOG overrides the default level

    // clap exits with status 2 on bad usage; the LS8 contract wants 1.
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            let _ = err.print();
            process::exit(EXIT_USAGE);
        }
    };

    let mut mem = match StdMem::from_file(&args.image) {
        Ok(mem) => mem,
        Err(err) => {
            eprintln!("error: {}", err);
            if let LoadError::Parse(errors) = &err {
                for line_err in errors {
                    eprintln!("  {}", line_err);
                }
            }
            let code = match err {
                LoadError::Io(_) => EXIT_MISSING,
                LoadError::Parse(_) => EXIT_USAGE,
                LoadError::EmptyProgram => EXIT_EMPTY,
            };
            process::exit(code);
        }
    };

    let mut cpu = Processor::new();
    if let Err(err) = cpu.run(&mut mem) {
        eprintln!("error: {}", err);
        process::exit(EXIT_USAGE);
    }

    Ok(())
}
