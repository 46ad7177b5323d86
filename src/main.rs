//! Thin CLI layer: parse args, load the index, call into depsolve-core and
//! render the result. Exit status is 1 when resolution fails.

mod report;

use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};
use colored::Colorize;
use depsolve_core::{load_config, Config, MemoryIndex, Requirement, Resolver};

use crate::report::Report;

fn cli() -> Command {
    let index_arg = Arg::new("index")
        .short('i')
        .long("index")
        .value_parser(clap::value_parser!(PathBuf))
        .help("JSON package index (default: .depsolverc `index` or DEPSOLVE_INDEX)");

    Command::new("depsolve")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Resolve package requirements against an index, one version per package")
        .after_help(
            "Examples:\n  depsolve resolve -i index.json 'rails ~> 2.3' rack\n  depsolve show -i index.json rack",
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::Count)
                .global(true)
                .help("Log resolver steps (-v debug, -vv trace); RUST_LOG also works"),
        )
        .subcommand_required(true)
        .subcommand(
            Command::new("resolve")
                .about("Resolve requirements such as `rack >= 1.0` or `rails`")
                .arg(
                    Arg::new("requirement")
                        .required(true)
                        .num_args(1..)
                        .help("Requirement(s): a package name optionally followed by a constraint"),
                )
                .arg(index_arg.clone())
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Output machine-readable JSON result"),
                ),
        )
        .subcommand(
            Command::new("show")
                .about("List the versions and dependencies the index knows for a package")
                .arg(Arg::new("package").required(true).help("Package name"))
                .arg(index_arg),
        )
}

fn init_logging(verbosity: u8) {
    let default = match verbosity {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .format_timestamp(None)
        .init();
}

fn load_index(matches: &ArgMatches, config: &Config) -> Result<MemoryIndex> {
    let path = matches
        .get_one::<PathBuf>("index")
        .or(config.index.as_ref())
        .ok_or_else(|| anyhow!("no index given: pass --index FILE or set DEPSOLVE_INDEX"))?;
    read_index(path)
}

fn read_index(path: &Path) -> Result<MemoryIndex> {
    log::debug!("reading index {}", path.display());
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read index {}", path.display()))?;
    MemoryIndex::from_json_str(&content)
        .with_context(|| format!("invalid index {}", path.display()))
}

fn run_resolve(matches: &ArgMatches, config: &Config) -> Result<i32> {
    let index = load_index(matches, config)?;
    let requirements = matches
        .get_many::<String>("requirement")
        .into_iter()
        .flatten()
        .map(|s| Requirement::parse(s).with_context(|| format!("bad requirement `{s}`")))
        .collect::<Result<Vec<_>>>()?;
    let json = matches.get_flag("json") || config.json.unwrap_or(false);

    match Resolver::new(&index).run(requirements) {
        Ok(resolution) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&Report::success(&resolution))?);
            } else {
                report::print_resolution(&resolution);
            }
            Ok(0)
        }
        Err(errors) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&Report::failure(&errors))?);
            } else {
                report::print_errors(&errors);
            }
            Ok(1)
        }
    }
}

fn run_show(matches: &ArgMatches, config: &Config) -> Result<i32> {
    let index = load_index(matches, config)?;
    let name = matches
        .get_one::<String>("package")
        .ok_or_else(|| anyhow!("missing package name"))?;
    if !report::print_versions(&index, name) {
        bail!("{} is not in the index", name);
    }
    Ok(0)
}

fn run() -> Result<i32> {
    let matches = cli().get_matches();
    init_logging(matches.get_count("verbose"));

    let cwd = std::env::current_dir().context("failed to read current directory")?;
    let config = load_config(&cwd).with_env();
    let color = config.color.unwrap_or_else(|| std::io::stdout().is_terminal());
    colored::control::set_override(color);

    match matches.subcommand() {
        Some(("resolve", sub)) => run_resolve(sub, &config),
        Some(("show", sub)) => run_show(sub, &config),
        _ => bail!("unknown command"),
    }
}

fn main() {
    let code = match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}", format!("error: {e:#}").red());
            1
        }
    };
    std::process::exit(code);
}
