mod args;
mod import;
mod tabular;

use clap::Parser;
use log::{info, LevelFilter};

use crate::import::{run_import, ImportError, RunOptions};

fn main() {
    let args = args::Args::parse();

    let mut builder = env_logger::Builder::from_default_env();
    if args.verbose {
        builder
            .filter_module("votetally", LevelFilter::Debug)
            .filter_module("ballot_results", LevelFilter::Debug);
    }
    builder.init();
    info!("main: args: {:?}", args);

    let options = RunOptions {
        config_path: args.config,
        input: args.input,
        input_type: args.input_type,
        ballot_type: args.ballot_type,
        out: args.out,
        export: args.export,
        reference: args.reference,
    };

    match run_import(&options) {
        Ok(()) => {}
        Err(ImportError::ImportFailed { errors }) => {
            for e in errors {
                eprintln!("{}", e);
            }
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("An error occured {}", e);
            std::process::exit(1);
        }
    }
}
