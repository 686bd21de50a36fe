use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};
use openapi_helper::config::{ACCESS_TOKEN_VAR, BASE_URL_VAR};
use openapi_helper::request::DEFAULT_METHOD;
use openapi_helper::{Body, RequestConfig, RequestExecutor, RequestOptions, Spec, cli, listing, spec};

const DEFAULT_SPEC: &str = "homebox-openapi.yaml";

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    cli::init_logging();
    let matches = build_cli().get_matches();

    if matches.get_flag("request") {
        // Configuration is checked before the document is read or any
        // connection is made.
        let config = request_config(&matches)?;
        let spec = load_spec(&matches)?;
        return handle_request(&spec, config, &matches);
    }

    let spec = load_spec(&matches)?;
    match matches.get_one::<String>("path") {
        None => cli::with_stdout(|out| listing::list_endpoints(&spec, false, out)),
        Some(path) => {
            let method = matches.get_one::<String>("method").map(String::as_str);
            cli::with_stdout(|out| listing::show_endpoint(&spec, path, method, out))
        }
    }
}

fn build_cli() -> Command {
    Command::new("openapi-request")
        .about("Inspect the Homebox OpenAPI spec or call one of its endpoints")
        .arg(cli::path_arg())
        .arg(cli::method_arg().help(format!(
            "HTTP method to inspect, or to send with --request (default: {DEFAULT_METHOD})"
        )))
        .arg(
            Arg::new("request")
                .long("request")
                .action(ArgAction::SetTrue)
                .requires("path")
                .help("Send a live request instead of showing the definition"),
        )
        .arg(
            Arg::new("accept")
                .long("accept")
                .value_name("MEDIA_TYPE")
                .requires("request")
                .help("Override the inferred Accept header"),
        )
        .arg(
            Arg::new("content_type")
                .long("content-type")
                .value_name("MEDIA_TYPE")
                .requires("request")
                .help("Override the inferred Content-Type header"),
        )
        .arg(
            Arg::new("data")
                .long("data")
                .value_name("BODY")
                .requires("request")
                .allow_hyphen_values(true)
                .help("Request body (or @file to send a file's bytes)"),
        )
        .arg(cli::spec_arg(DEFAULT_SPEC))
        .arg(
            Arg::new("base_url")
                .long("base-url")
                .value_name("URL")
                .help(format!("Override {BASE_URL_VAR}")),
        )
        .arg(
            Arg::new("access_token")
                .long("access-token")
                .value_name("TOKEN")
                .help(format!("Override {ACCESS_TOKEN_VAR}")),
        )
}

fn request_config(matches: &ArgMatches) -> Result<RequestConfig> {
    Ok(RequestConfig::from_env_with_overrides(
        matches.get_one::<String>("base_url").cloned(),
        matches.get_one::<String>("access_token").cloned(),
    )?)
}

fn load_spec(matches: &ArgMatches) -> Result<Spec> {
    let spec_path = matches
        .get_one::<String>("spec")
        .map_or(DEFAULT_SPEC, String::as_str);
    spec::load_yaml(Path::new(spec_path)).with_context(|| format!("load spec {spec_path}"))
}

fn handle_request(spec: &Spec, config: RequestConfig, matches: &ArgMatches) -> Result<()> {
    let path = matches
        .get_one::<String>("path")
        .context("--request needs an endpoint path")?;

    let body = matches
        .get_one::<String>("data")
        .map(|value| Body::from_arg(value))
        .transpose()
        .context("read request body")?;
    let options = RequestOptions {
        method: matches
            .get_one::<String>("method")
            .cloned()
            .unwrap_or_else(|| DEFAULT_METHOD.to_string()),
        accept: matches.get_one::<String>("accept").cloned(),
        content_type: matches.get_one::<String>("content_type").cloned(),
        body,
    };

    let executor = RequestExecutor::new(config)?;
    let output = executor.execute(spec, path, options)?;
    cli::with_stdout(|out| out.write_all(&output))
}
