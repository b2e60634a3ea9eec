// build.rs

use clap::{Arg, ArgAction, Command};
use clap_mangen::Man;
use std::env;
use std::fs;
use std::path::PathBuf;

/// Common argument: output file
fn output_arg() -> Arg {
    Arg::new("output")
        .short('o')
        .long("output")
        .value_name("FILE")
        .help("Output file (default: third-party-notices.txt)")
}

fn build_cli() -> Command {
    Command::new("notices")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Notices Contributors")
        .about("Generate a third-party license notices file for a project's dependencies")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("PATH")
                .global(true)
                .help("Config file (default: ~/.config/notices/config.toml when present)"),
        )
        .arg(
            Arg::new("github_token")
                .long("github-token")
                .value_name("TOKEN")
                .global(true)
                .help("GitHub token for API lookups (overrides GITHUB_TOKEN and the config file)"),
        )
        .arg(
            Arg::new("concurrency")
                .short('j')
                .long("concurrency")
                .value_name("N")
                .global(true)
                .help("Number of records resolved concurrently"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Enable debug logging"),
        )
        .subcommand(
            Command::new("scan")
                .about("Scan a directory for binaries and write their license notices")
                .arg(Arg::new("dir").default_value(".").help("Directory to scan"))
                .arg(
                    Arg::new("filter")
                        .short('f')
                        .long("filter")
                        .value_name("REGEX")
                        .help("Only include binaries whose path matches this regex"),
                )
                .arg(output_arg()),
        )
        .subcommand(
            Command::new("resolve")
                .about("Resolve records from a JSON file and write their license notices")
                .arg(Arg::new("records").required(true).help("JSON array of dependency records"))
                .arg(output_arg()),
        )
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    let manifest_dir = match env::var("CARGO_MANIFEST_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(e) => {
            println!("cargo:warning=CARGO_MANIFEST_DIR not set: {}", e);
            return;
        }
    };
    let man_dir = manifest_dir.join("man");

    if let Err(e) = fs::create_dir_all(&man_dir) {
        println!("cargo:warning=Failed to create man directory: {}", e);
        return;
    }

    let man = Man::new(build_cli());
    let mut buffer = Vec::new();

    if let Err(e) = man.render(&mut buffer) {
        println!("cargo:warning=Failed to render man page: {}", e);
        return;
    }

    let man_path = man_dir.join("notices.1");
    if let Err(e) = fs::write(&man_path, buffer) {
        println!("cargo:warning=Failed to write man page: {}", e);
    }
}
