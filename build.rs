// build.rs

use clap::{Arg, ArgAction, Command};
use clap_mangen::Man;
use std::env;
use std::fs;
use std::path::PathBuf;

fn build_cli() -> Command {
    Command::new("repotool")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Repotool Contributors")
        .about("Build and maintain a package repository database")
        .subcommand_required(false)
        .arg(
            Arg::new("work_dir")
                .short('C')
                .long("work-dir")
                .value_name("DIR")
                .global(true)
                .help("Working directory (default: current directory)"),
        )
        .arg(
            Arg::new("cache_dir")
                .long("cache-dir")
                .value_name("DIR")
                .global(true)
                .default_value("dbcache")
                .help("Cache store directory, relative to the working directory"),
        )
        .arg(
            Arg::new("db_name")
                .long("db-name")
                .value_name("FILE")
                .global(true)
                .default_value("intg.db.tar.zst")
                .help("Database archive file name"),
        )
        .arg(
            Arg::new("level")
                .long("level")
                .global(true)
                .default_value("19")
                .help("zstd compression level for the database archive (1-22)"),
        )
        .subcommand(
            Command::new("add")
                .about("Register packages and rebuild the database")
                .arg(
                    Arg::new("packages")
                        .action(ArgAction::Append)
                        .help("Package archives to register"),
                )
                .arg(
                    Arg::new("create_repo")
                        .long("create-repo")
                        .value_name("NAME")
                        .num_args(0..=1)
                        .help("Also publish packages and database to ./root/<NAME>"),
                ),
        )
        .subcommand(Command::new("rebuild").about("Rebuild the database from the cache store"))
        .subcommand(
            Command::new("remove")
                .about("Remove packages from the cache store and rebuild the database")
                .arg(
                    Arg::new("names")
                        .action(ArgAction::Append)
                        .help("Package names to remove"),
                ),
        )
        .subcommand(
            Command::new("list")
                .about("List packages staged in the cache store")
                .arg(
                    Arg::new("database")
                        .long("database")
                        .action(ArgAction::SetTrue)
                        .help("List the entries of the database archive instead"),
                ),
        )
        .subcommand(
            Command::new("completions")
                .about("Generate shell completion scripts")
                .arg(
                    Arg::new("shell")
                        .required(true)
                        .value_parser(["bash", "elvish", "fish", "powershell", "zsh"])
                        .help("Shell type"),
                ),
        )
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    // Create man directory
    let out_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap());
    let man_dir = out_dir.join("man");
    fs::create_dir_all(&man_dir).expect("Failed to create man directory");

    // Generate main man page
    let cmd = build_cli();
    let man = Man::new(cmd);
    let mut buffer = Vec::new();
    man.render(&mut buffer)
        .expect("Failed to render man page");

    let man_path = man_dir.join("repotool.1");
    fs::write(&man_path, buffer).expect("Failed to write man page");
}
