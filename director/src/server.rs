use crate::resolver::ServerIdentity;
use log::debug;
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::ExitStatus;
use thiserror::Error;
use tokio::process::Command;

const SRCDS: &str = "srcds_run";

#[derive(Debug, Error)]
pub enum ServerError {
  #[error("{} does not contain a TF2 server installation", .0.display())]
  InvalidPath(PathBuf),
  #[error("error in running server command")]
  Io(#[from] std::io::Error),
  #[error("`{command}` failed with {status}")]
  CommandFailed {
    command: &'static str,
    status: ExitStatus,
  },
}

/// A running (or runnable) dedicated server, addressed by its identity.
#[allow(async_fn_in_trait)]
pub trait ServerProcess {
  fn identity(&self) -> &ServerIdentity;

  async fn start(
    &self,
    ip: &str,
    port: u16,
    map: &str,
    config_file: &str,
  ) -> Result<(), ServerError>;

  async fn stop(&self) -> Result<(), ServerError>;
}

/// Runs `srcds_run` inside a detached tmux session named after the server.
#[derive(Debug)]
pub struct Tf2Server {
  identity: ServerIdentity,
}

impl Tf2Server {
  pub fn new(identity: ServerIdentity) -> Self {
    Self { identity }
  }

  pub fn session_name(&self) -> String {
    format!("tf2-{}", self.identity.name)
  }

  fn is_likely_tf2_directory(&self) -> bool {
    self.identity.path.join(SRCDS).is_file()
  }

  pub fn srcds_args(&self, ip: &str, port: u16, map: &str, config_file: &str) -> Vec<OsString> {
    let port = port.to_string();
    let mut args = vec![self.identity.path.join(SRCDS).into_os_string()];
    args.extend(
      [
        "-game",
        "tf",
        "+ip",
        ip,
        "-port",
        port.as_str(),
        "+map",
        map,
        "+servercfgfile",
        config_file,
      ]
      .map(OsString::from),
    );
    args
  }
}

async fn run_tmux(command: &'static str, args: Vec<OsString>) -> Result<(), ServerError> {
  debug!("tmux {command} {args:?}");
  let status = Command::new("tmux").arg(command).args(args).status().await?;
  if !status.success() {
    return Err(ServerError::CommandFailed { command, status });
  }

  Ok(())
}

impl ServerProcess for Tf2Server {
  fn identity(&self) -> &ServerIdentity {
    &self.identity
  }

  async fn start(
    &self,
    ip: &str,
    port: u16,
    map: &str,
    config_file: &str,
  ) -> Result<(), ServerError> {
    if !self.is_likely_tf2_directory() {
      return Err(ServerError::InvalidPath(self.identity.path.clone()));
    }

    let mut args: Vec<OsString> = ["-d", "-s"].map(OsString::from).into();
    args.push(self.session_name().into());
    args.push("-c".into());
    args.push(self.identity.path.clone().into_os_string());
    args.extend(self.srcds_args(ip, port, map, config_file));

    run_tmux("new-session", args).await
  }

  async fn stop(&self) -> Result<(), ServerError> {
    let args = vec![OsString::from("-t"), self.session_name().into()];
    run_tmux("kill-session", args).await
  }
}
