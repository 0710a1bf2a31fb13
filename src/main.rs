mod cli;

use clap::Parser;

fn main() {
    let cli = cli::Cli::parse();

    let level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    if let Err(err) = cli::execute(cli) {
        eprintln!("{err}");
        std::process::exit(1);
    }
}
