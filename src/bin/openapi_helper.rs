use std::path::Path;

use anyhow::{Context, Result};
use clap::{Arg, ArgAction, Command};
use openapi_helper::{cli, listing, spec};

const DEFAULT_SPEC: &str = "homebox-swagger.json";

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    cli::init_logging();
    let matches = build_cli().get_matches();

    let spec_path = matches
        .get_one::<String>("spec")
        .map_or(DEFAULT_SPEC, String::as_str);
    let spec = spec::load_json(Path::new(spec_path))
        .with_context(|| format!("load spec {spec_path}"))?;

    match matches.get_one::<String>("path") {
        None => {
            let verbose = matches.get_flag("verbose");
            cli::with_stdout(|out| listing::list_endpoints(&spec, verbose, out))
        }
        Some(path) => {
            let method = matches.get_one::<String>("method").map(String::as_str);
            cli::with_stdout(|out| listing::show_endpoint(&spec, path, method, out))
        }
    }
}

fn build_cli() -> Command {
    Command::new("openapi-helper")
        .about("Inspect the Homebox OpenAPI spec")
        .arg(cli::path_arg())
        .arg(cli::method_arg())
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::SetTrue)
                .help("Show HTTP methods and summaries when listing endpoints"),
        )
        .arg(cli::spec_arg(DEFAULT_SPEC))
}
