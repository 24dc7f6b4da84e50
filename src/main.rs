use anyhow::Result;
use clap::{App, Arg};
use std::path::Path;
use std::process;
use waymark::build::build_site;
use waymark::config::Config;

fn main() {
    let matches = App::new("waymark")
        .about("Builds a static site from a directory of posts and a guides catalogue")
        .arg(
            Arg::with_name("project")
                .help("Project directory; the project file is searched for upwards from here")
                .index(1),
        )
        .arg(
            Arg::with_name("output")
                .short("o")
                .long("output")
                .takes_value(true)
                .default_value("_site")
                .help("Output directory"),
        )
        .arg(
            Arg::with_name("threads")
                .short("t")
                .long("threads")
                .takes_value(true)
                .help("Worker threads (defaults to the number of CPUs)"),
        )
        .get_matches();

    if let Err(err) = run(&matches) {
        eprintln!("error: {}", err);
        process::exit(1);
    }
}

fn run(matches: &clap::ArgMatches) -> Result<()> {
    let project = Path::new(matches.value_of("project").unwrap_or("."));
    let output = Path::new(matches.value_of("output").unwrap_or("_site"));
    let threads = match matches.value_of("threads") {
        Some(threads) => Some(threads.parse()?),
        None => None,
    };

    let config = Config::from_directory(&project.canonicalize()?, output, threads)?;
    build_site(&config)?;
    Ok(())
}
