use std::fs::File;
use std::io::{self, BufReader};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::error;

use flatfs_net::Client;
use tools::Shell;

#[derive(Parser)]
#[command(about = "Shell for a remote flatfs volume")]
struct Args {
    /// Server to mount, as HOST:PORT
    server: String,

    /// Replay commands from a file instead of reading the terminal
    #[arg(short, long)]
    script: Option<PathBuf>,

    /// More log output, repeat for more detail
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let args = Args::parse();
    tools::init_logger(args.verbose);

    let client = match Client::connect(args.server.as_str()) {
        Ok(client) => client,
        Err(err) => {
            error!("cannot mount {}: {}", args.server, err);
            return ExitCode::FAILURE;
        }
    };
    let mut shell = Shell::new(client, io::stdout());

    let result = match &args.script {
        Some(path) => match File::open(path) {
            Ok(file) => shell.run(BufReader::new(file), true),
            Err(err) => {
                error!("could not open script file {}: {}", path.display(), err);
                return ExitCode::FAILURE;
            }
        },
        None => shell.run(io::stdin().lock(), false),
    };

    if let Err(err) = result {
        error!("{}", err);
        return ExitCode::FAILURE;
    }
    let (client, _) = shell.into_parts();
    if let Err(err) = client.disconnect() {
        error!("{}", err);
    }
    ExitCode::SUCCESS
}
