// DevCmd - one-shot command client for embedded devices
use clap::Parser;
use devcmd::cli::args::Args;
use devcmd::cli::commands::execute_command;
use devcmd::cli::output::{ConsoleWriter, OutputWriter};

#[tokio::main]
async fn main() {
    let args = Args::parse();
    let writer = ConsoleWriter::new(args.output.clone());

    if let Err(e) = execute_command(args).await {
        if writer.write_error(&e.to_string()).is_err() {
            eprintln!("Error: {}", e);
        }
        std::process::exit(1);
    }
}
