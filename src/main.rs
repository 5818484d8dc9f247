use std::path::{Path,PathBuf};
use std::process::ExitCode;
use dfskit::cli;
use dfskit::commands;
use dfskit::error::Error;

fn run() -> Result<(),Box<dyn std::error::Error>> {
    let cli = cli::build_cli();
    let matches = cli.get_matches();

    let verbosity = cli::verbosity(&matches);
    env_logger::Builder::new()
        .filter_level(cli::log_level_filter(verbosity))
        .init();

    let input = PathBuf::from(matches.get_one::<String>("input").expect("input is required"));
    let output = matches.get_one::<String>("output").map(PathBuf::from);
    let cat = matches.get_flag("cat");

    if !input.exists() {
        return Err(Box::new(Error::InputMissing));
    }

    if cat {
        if output.is_some() {
            log::warn!("--cat lists the catalogue only; the output argument is ignored");
        }
        let model = commands::catalog::load_model(&input)?;
        return commands::catalog::run(&model,verbosity);
    }

    match output {
        None => {
            let model = commands::catalog::load_model(&input)?;
            commands::catalog::run(&model,verbosity)
        },
        Some(output) => dispatch(&input,&output),
    }
}

fn dispatch(input: &Path, output: &Path) -> Result<(),Box<dyn std::error::Error>> {
    if input.is_dir() {
        commands::pack::run(input,output)
    } else {
        commands::unpack::run(input,output)
    }
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if e.downcast_ref::<Error>().map(|e| matches!(e,Error::InputMissing)).unwrap_or(false) {
                eprintln!("error: {e}");
                return ExitCode::from(2);
            }
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
