//! The Tern compiler CLI.
//!
//! Takes a source file and an output path, runs the pipeline, and writes
//! the generated assembly. Errors and warnings are rendered by the
//! diagnostics module; any failure exits non-zero.

use clap::Parser;

use tern::diagnostics;
use tern::driver::Driver;

/// Command-line interface for the Tern compiler.
#[derive(Parser)]
#[command(name = "tern")]
#[command(about = "Compiler for the Tern language", long_about = None)]
struct Cli {
    /// The source file to compile (e.g. `program.tn`).
    input: String,

    /// The assembly file to write (e.g. `program.s`).
    output: String,
}

fn main() {
    let cli = Cli::parse();
    let mut driver = Driver::new();

    match driver.compile_file(&cli.input) {
        Ok(output) => {
            for warning in &output.warnings {
                diagnostics::report_warning(driver.sources(), warning);
            }
            if let Err(error) = std::fs::write(&cli.output, output.assembly) {
                eprintln!("Error: failed to write '{}': {}", cli.output, error);
                std::process::exit(1);
            }
        }
        Err(error) => {
            diagnostics::report_error(driver.sources(), &error);
            std::process::exit(1);
        }
    }
}
