mod args;
mod survey;

use clap::Parser;
use log::{debug, info};
use snafu::ErrorCompat;

use crate::args::Args;

fn main() {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level));
    if args.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.init();

    debug!("args: {:?}", args);

    let res = survey::run_survey(
        &args.input,
        &args.output_dir,
        args.input_type.as_deref(),
        args.config.as_deref(),
        args.reference.as_deref(),
    );

    match res {
        Ok(()) => {
            info!("Outputs written to {}", args.output_dir);
        }
        Err(e) => {
            eprintln!("An error occurred: {}", e);
            if let Some(bt) = ErrorCompat::backtrace(e.as_ref()) {
                eprintln!("trace: {}", bt);
            }
            std::process::exit(1);
        }
    }
}
