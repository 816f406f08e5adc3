pub mod resolver;
pub mod server;

use clap::ValueEnum;
use log::{debug, info};
use resolver::{ConfigurationError, DirectorConfig};
use server::{ServerError, ServerProcess, Tf2Server};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DirectorError {
  #[error(transparent)]
  Configuration(#[from] ConfigurationError),
  #[error(transparent)]
  Server(#[from] ServerError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Action {
  Start,
  Stop,
}

/// Issues exactly one start or stop request to `server`.
pub async fn run_action(
  server: &impl ServerProcess,
  action: Action,
  config: &DirectorConfig,
) -> Result<(), DirectorError> {
  let name = &server.identity().name;
  match action {
    Action::Start => {
      let defaults = config.defaults()?;
      let resolved = config.resolve(name)?;
      debug!("resolved {resolved:?} on {}", defaults.ip);

      info!(
        "Starting server \"{name}\" on {}:{} with map {}",
        defaults.ip, resolved.port, resolved.initial_map
      );
      server
        .start(
          &defaults.ip,
          resolved.port,
          &resolved.initial_map,
          &resolved.server_config_file,
        )
        .await?;
    }
    Action::Stop => {
      info!("Stopping server \"{name}\"");
      server.stop().await?;
    }
  }

  Ok(())
}

#[tokio::main(flavor = "current_thread")]
pub async fn run_director(server_name: &str, action: Action) -> Result<(), DirectorError> {
  let home = resolver::home_dir()?;
  let config = DirectorConfig::load(&resolver::config_file_path(&home))?.with_home(home);
  let server = Tf2Server::new(config.server(server_name)?);

  run_action(&server, action, &config).await
}
