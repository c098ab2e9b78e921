use clap::{Arg, ArgAction, ArgMatches, Command};
use std::path::Path;
use std::process::ExitCode;

use polysync::logging::*;
use polysync::{Config, SyncEngine, SyncError, SyncReport, TransportRegistry};

///////////////////////
// Command line      //
///////////////////////

fn backend_options_help(registry: &TransportRegistry) -> String {
	let mut help = String::from("Backend options (-O scheme.key=value):");
	for scheme in registry.schemes() {
		let Some(capabilities) = registry.capabilities(scheme) else {
			continue;
		};
		for (name, description) in &capabilities.options {
			help.push_str(&format!("\n  {}.{}  {}", scheme, name, description));
		}
	}
	help
}

fn flag(name: &'static str) -> Arg {
	Arg::new(name).action(ArgAction::SetTrue)
}

fn pattern(name: &'static str, help: &'static str) -> Arg {
	Arg::new(name).long(name).value_name("PATTERN").help(help)
}

fn build_cli(registry: &TransportRegistry) -> Command {
	Command::new("polysync")
		.version(env!("CARGO_PKG_VERSION"))
		.about("Multiprotocol one-way synchronizer")
		.after_help(backend_options_help(registry))
		.arg(Arg::new("source").required(true).help("Source URL or path"))
		.arg(Arg::new("destination").required(true).help("Destination URL or path"))
		.arg(flag("recursive").short('r').long("recursive").help("Recurse into directories"))
		.arg(
			flag("update")
				.short('u')
				.long("update")
				.help("Update only (don't overwrite newer files on destination)"),
		)
		.arg(flag("delete").long("delete").help("Delete extraneous files from destination"))
		.arg(
			flag("dry-run")
				.short('n')
				.long("dry-run")
				.help("Show what would have been transferred"),
		)
		.arg(flag("perms").short('p').long("perms").help("Preserve permissions"))
		.arg(flag("owner").short('o').long("owner").help("Preserve owner"))
		.arg(flag("group").short('g').long("group").help("Preserve group"))
		.arg(
			Arg::new("attribute")
				.long("attribute")
				.value_name("NAME")
				.action(ArgAction::Append)
				.help("Preserve the named attribute (repeatable)"),
		)
		.arg(pattern("exclude-files", "Exclude files matching the PATTERN regex"))
		.arg(pattern("include-files", "Don't exclude files matching the PATTERN regex"))
		.arg(pattern("exclude-dirs", "Exclude directories matching the PATTERN regex"))
		.arg(pattern("include-dirs", "Don't exclude directories matching the PATTERN regex"))
		.arg(
			flag("no-update-propagation")
				.long("no-update-propagation")
				.help(
					"Leave attributes alone on files skipped by --update. With propagation on, \
					 the skipped file takes the source mtime, so the next --update run \
					 overwrites the newer destination",
				),
		)
		.arg(
			Arg::new("config")
				.short('c')
				.long("config")
				.value_name("FILE")
				.help("Load settings from a TOML or JSON5 file"),
		)
		.arg(
			Arg::new("option")
				.short('O')
				.long("option")
				.value_name("SCHEME.KEY=VALUE")
				.action(ArgAction::Append)
				.help("Set a backend option"),
		)
		.arg(flag("quiet").short('q').long("quiet").help("Only report errors"))
		.arg(
			flag("debug")
				.short('d')
				.long("debug")
				.conflicts_with("quiet")
				.help("Talk too much"),
		)
}

fn verbosity(matches: &ArgMatches) -> Verbosity {
	if matches.get_flag("quiet") {
		Verbosity::Quiet
	} else if matches.get_flag("debug") {
		Verbosity::Debug
	} else {
		Verbosity::Normal
	}
}

/// Command line flags override what the config file said
fn apply_flags(config: &mut Config, matches: &ArgMatches) -> Result<(), SyncError> {
	config.recursive |= matches.get_flag("recursive");
	config.update |= matches.get_flag("update");
	config.delete |= matches.get_flag("delete");
	config.dry_run |= matches.get_flag("dry-run");
	if matches.get_flag("no-update-propagation") {
		config.propagate_on_update_skip = false;
	}

	for name in ["perms", "owner", "group"] {
		if matches.get_flag(name) && !config.attributes.iter().any(|a| a == name) {
			config.attributes.push(name.to_string());
		}
	}
	if let Some(names) = matches.get_many::<String>("attribute") {
		config.attributes.extend(names.cloned());
	}

	for (name, field) in [
		("exclude-files", &mut config.exclude_files),
		("include-files", &mut config.include_files),
		("exclude-dirs", &mut config.exclude_dirs),
		("include-dirs", &mut config.include_dirs),
	] {
		if let Some(value) = matches.get_one::<String>(name) {
			*field = Some(value.clone());
		}
	}

	for option in matches.get_many::<String>("option").into_iter().flatten() {
		let parsed = option.split_once('=').and_then(|(path, value)| {
			path.split_once('.').map(|(scheme, key)| (scheme, key, value))
		});
		match parsed {
			Some((scheme, key, value)) if !scheme.is_empty() && !key.is_empty() => {
				config.set_option(scheme, key, value)
			}
			_ => {
				return Err(SyncError::InvalidConfig {
					message: format!("Backend option must look like scheme.key=value: {}", option),
				})
			}
		}
	}

	Ok(())
}

async fn run(matches: &ArgMatches, registry: TransportRegistry) -> Result<SyncReport, SyncError> {
	let mut config = match matches.get_one::<String>("config") {
		Some(path) => Config::load(Path::new(path))?,
		None => Config::default(),
	};
	apply_flags(&mut config, matches)?;

	let location = |name: &str| {
		matches.get_one::<String>(name).cloned().ok_or_else(|| SyncError::InvalidConfig {
			message: format!("Missing {} argument", name),
		})
	};
	let (source, destination) = (location("source")?, location("destination")?);

	SyncEngine::new(config, registry)?.sync(&source, &destination).await
}

#[tokio::main]
async fn main() -> ExitCode {
	let registry = TransportRegistry::with_defaults();
	let matches = build_cli(&registry).get_matches();
	init_tracing(verbosity(&matches));

	match run(&matches, registry).await {
		Ok(_) => ExitCode::SUCCESS,
		Err(e) => {
			error!("{}", e);
			ExitCode::FAILURE
		}
	}
}


// vim: ts=4
