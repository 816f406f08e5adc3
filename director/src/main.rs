use clap::builder::NonEmptyStringValueParser;
use clap::Parser;
use env_logger::Env;
use std::error::Error;
use std::process::ExitCode;
use tf2director::resolver::ConfigurationError;
use tf2director::{Action, DirectorError};

/// tf2director is a script that helps managing multiple Team Fortress 2 server instances.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
  /// Server to be used
  #[arg(value_parser = NonEmptyStringValueParser::new())]
  server: String,
  /// Action to do
  #[arg(value_enum)]
  action: Action,
}

fn main() -> ExitCode {
  env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
  let args = Args::parse();

  match tf2director::run_director(&args.server, args.action) {
    Ok(()) => ExitCode::SUCCESS,
    Err(DirectorError::Configuration(ConfigurationError::MissingConfigFile(path))) => {
      println!("Config file missing ({})", path.display());
      ExitCode::from(1)
    }
    Err(error) => {
      eprintln!("Error: {error}");
      let mut source = error.source();
      while let Some(cause) = source {
        eprintln!("  caused by: {cause}");
        source = cause.source();
      }
      ExitCode::from(1)
    }
  }
}
