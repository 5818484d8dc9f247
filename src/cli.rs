//! Command-line argument grammar, built with clap's builder API in the style
//! the rest of this tool's ancestry uses it.

use clap::{Command,Arg,ArgAction,ArgMatches};

pub fn build_cli() -> Command {
    Command::new("dfskit")
        .about("Round-trips BBC Micro Acorn DFS disc images (.ssd) to and from a directory of files")
        .arg(Arg::new("input")
            .help("SSD image to unpack, or a previously-unpacked directory to pack")
            .required(true))
        .arg(Arg::new("output")
            .help("destination directory (unpack) or SSD image path (pack)")
            .required(false))
        .arg(Arg::new("cat")
            .short('c')
            .long("cat")
            .help("list catalogue contents instead of converting")
            .action(ArgAction::SetTrue))
        .arg(Arg::new("verbose")
            .short('v')
            .long("verbose")
            .help("increase diagnostic detail, repeatable up to 3 times")
            .action(ArgAction::Count))
        .after_long_help(
r#"EXAMPLES:
    dfskit disc.ssd                 catalogue disc.ssd to stdout
    dfskit disc.ssd --cat           same as above
    dfskit disc.ssd unpacked/       unpack disc.ssd into unpacked/
    dfskit unpacked/ disc.ssd       pack unpacked/ back into disc.ssd
"#)
}

/// Verbosity count, 0-3, clamped from the repeated `-v` flag.
pub fn verbosity(matches: &ArgMatches) -> u8 {
    matches.get_count("verbose").min(3)
}

pub fn log_level_filter(verbosity: u8) -> log::LevelFilter {
    match verbosity {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    }
}
