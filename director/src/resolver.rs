use ini::{Ini, ParseOption, Properties};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const CONFIG_FILE_NAME: &str = "tf2director.ini";
pub const DEFAULT_SECTION: &str = "default";

pub const DEFAULT_PORT: u16 = 27015;
pub const DEFAULT_MAP: &str = "cp_badlands";
pub const DEFAULT_SERVER_CONFIG: &str = "server.cfg";

#[derive(Debug, Error)]
pub enum ConfigurationError {
  #[error("config file missing ({})", .0.display())]
  MissingConfigFile(PathBuf),
  #[error("could not determine the home directory")]
  NoHomeDirectory,
  #[error("error in reading config file")]
  Read(#[from] std::io::Error),
  #[error("error in parsing config file")]
  Parse(#[from] ini::ParseError),
  #[error("server \"{0}\" is not configured")]
  UnknownServer(String),
  #[error("server \"{0}\" has no path configured")]
  MissingPath(String),
  #[error("config file has no [default] section with an ip")]
  MissingDefaultSection,
  #[error("invalid port \"{value}\" for server \"{server}\"")]
  InvalidPort { server: String, value: String },
}

/// Settings shared by every server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalDefaults {
  pub ip: String,
}

/// Enough to address a server installation; stopping needs nothing else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerIdentity {
  pub name: String,
  pub path: PathBuf,
}

/// A server section with every optional key replaced by its default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
  pub name: String,
  pub path: PathBuf,
  pub port: u16,
  pub initial_map: String,
  pub server_config_file: String,
}

#[derive(Debug, Default)]
struct Section {
  ip: Option<String>,
  path: Option<String>,
  port: Option<String>,
  initial_map: Option<String>,
  server_config: Option<String>,
}

impl From<&Properties> for Section {
  fn from(properties: &Properties) -> Self {
    let mut section = Section::default();
    for (key, value) in properties.iter() {
      let slot = match key.to_lowercase().as_str() {
        "ip" => &mut section.ip,
        "path" => &mut section.path,
        "port" => &mut section.port,
        "initial_map" => &mut section.initial_map,
        "server_config" => &mut section.server_config,
        _ => continue,
      };
      *slot = Some(value.to_string());
    }
    section
  }
}

#[derive(Debug)]
pub struct DirectorConfig {
  sections: HashMap<String, Section>,
  home: Option<PathBuf>,
}

pub fn home_dir() -> Result<PathBuf, ConfigurationError> {
  env::var_os("HOME")
    .or_else(|| env::var_os("USERPROFILE"))
    .filter(|home| !home.is_empty())
    .map(PathBuf::from)
    .ok_or(ConfigurationError::NoHomeDirectory)
}

pub fn config_file_path(home: &Path) -> PathBuf {
  home.join(CONFIG_FILE_NAME)
}

fn expand_home(path: &str, home: Option<&Path>) -> PathBuf {
  match (path.strip_prefix('~'), home) {
    (Some(""), Some(home)) => home.to_path_buf(),
    (Some(rest), Some(home)) if rest.starts_with('/') || rest.starts_with('\\') => {
      home.join(&rest[1..])
    }
    _ => PathBuf::from(path),
  }
}

impl DirectorConfig {
  pub fn load(path: &Path) -> Result<Self, ConfigurationError> {
    if !path.is_file() {
      return Err(ConfigurationError::MissingConfigFile(path.to_path_buf()));
    }

    let text = fs::read_to_string(path)?;
    Self::parse(&text)
  }

  /// Values are taken verbatim: no quote stripping, no backslash escapes.
  pub fn parse(text: &str) -> Result<Self, ConfigurationError> {
    let options = ParseOption {
      enabled_quote: false,
      enabled_escape: false,
      ..ParseOption::default()
    };
    let document = Ini::load_from_str_opt(text, options)?;

    let mut sections = HashMap::new();
    for (name, properties) in document.iter() {
      if let Some(name) = name {
        sections
          .entry(name.to_string())
          .or_insert_with(|| Section::from(properties));
      }
    }

    Ok(Self {
      sections,
      home: None,
    })
  }

  /// Directory that a leading `~` in a server path expands to.
  pub fn with_home(mut self, home: impl Into<PathBuf>) -> Self {
    self.home = Some(home.into());
    self
  }

  fn section(&self, name: &str) -> Result<&Section, ConfigurationError> {
    self
      .sections
      .get(name)
      .ok_or_else(|| ConfigurationError::UnknownServer(name.to_string()))
  }

  fn identity(&self, name: &str, section: &Section) -> Result<ServerIdentity, ConfigurationError> {
    let path = section
      .path
      .as_deref()
      .ok_or_else(|| ConfigurationError::MissingPath(name.to_string()))?;

    Ok(ServerIdentity {
      name: name.to_string(),
      path: expand_home(path, self.home.as_deref()),
    })
  }

  pub fn defaults(&self) -> Result<GlobalDefaults, ConfigurationError> {
    let ip = self
      .sections
      .get(DEFAULT_SECTION)
      .and_then(|section| section.ip.clone())
      .ok_or(ConfigurationError::MissingDefaultSection)?;

    Ok(GlobalDefaults { ip })
  }

  pub fn server(&self, name: &str) -> Result<ServerIdentity, ConfigurationError> {
    self.identity(name, self.section(name)?)
  }

  pub fn resolve(&self, name: &str) -> Result<ServerConfig, ConfigurationError> {
    let section = self.section(name)?;
    let ServerIdentity { name, path } = self.identity(name, section)?;

    let port = match &section.port {
      Some(value) => value
        .trim()
        .parse()
        .map_err(|_| ConfigurationError::InvalidPort {
          server: name.clone(),
          value: value.clone(),
        })?,
      None => DEFAULT_PORT,
    };

    Ok(ServerConfig {
      port,
      initial_map: section
        .initial_map
        .clone()
        .unwrap_or_else(|| DEFAULT_MAP.to_string()),
      server_config_file: section
        .server_config
        .clone()
        .unwrap_or_else(|| DEFAULT_SERVER_CONFIG.to_string()),
      name,
      path,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const FULL: &str = "\
[default]
ip = 10.0.0.1

[myserver]
path = /srv/tf2

[custom]
path = /srv/custom
port = 27020
initial_map = ctf_2fort
server_config = custom.cfg
";

  fn parse(text: &str) -> DirectorConfig {
    DirectorConfig::parse(text).unwrap()
  }

  #[test]
  fn resolves_configured_values() {
    let server = parse(FULL).resolve("custom").unwrap();

    assert_eq!(server.path, PathBuf::from("/srv/custom"));
    assert_eq!(server.port, 27020);
    assert_eq!(server.initial_map, "ctf_2fort");
    assert_eq!(server.server_config_file, "custom.cfg");
  }

  #[test]
  fn path_is_kept_verbatim() {
    let config = parse(FULL);

    assert_eq!(config.server("myserver").unwrap().path, PathBuf::from("/srv/tf2"));
    assert_eq!(config.resolve("myserver").unwrap().path, PathBuf::from("/srv/tf2"));
  }

  #[test]
  fn port_defaults_to_27015() {
    let server = parse("[a]\npath = /a\ninitial_map = x\nserver_config = y.cfg\n")
      .resolve("a")
      .unwrap();

    assert_eq!(server.port, 27015);
    assert_eq!(server.initial_map, "x");
  }

  #[test]
  fn map_defaults_to_cp_badlands() {
    let server = parse("[a]\npath = /a\nport = 1234\nserver_config = y.cfg\n")
      .resolve("a")
      .unwrap();

    assert_eq!(server.initial_map, "cp_badlands");
    assert_eq!(server.port, 1234);
  }

  #[test]
  fn server_config_defaults_to_server_cfg() {
    let server = parse("[a]\npath = /a\nport = 1234\ninitial_map = x\n")
      .resolve("a")
      .unwrap();

    assert_eq!(server.server_config_file, "server.cfg");
  }

  #[test]
  fn unknown_server_is_a_configuration_error() {
    let config = parse(FULL);

    assert!(matches!(
      config.server("nope"),
      Err(ConfigurationError::UnknownServer(name)) if name == "nope"
    ));
    assert!(matches!(
      config.resolve("nope"),
      Err(ConfigurationError::UnknownServer(_))
    ));
  }

  #[test]
  fn section_without_path_is_rejected() {
    let config = parse("[a]\nport = 1\n");

    assert!(matches!(
      config.server("a"),
      Err(ConfigurationError::MissingPath(name)) if name == "a"
    ));
  }

  #[test]
  fn backslashes_in_path_are_kept() {
    let config = parse("[win]\npath = C:\\srv\\tf2\n[nl]\npath = /srv/tf2\\new\n");

    assert_eq!(config.server("win").unwrap().path, PathBuf::from(r"C:\srv\tf2"));
    assert_eq!(config.server("nl").unwrap().path, PathBuf::from(r"/srv/tf2\new"));
  }

  #[test]
  fn quotes_in_path_are_kept() {
    let config = parse("[a]\npath = \"/srv/tf2\"\n");

    assert_eq!(config.server("a").unwrap().path, PathBuf::from("\"/srv/tf2\""));
  }

  #[test]
  fn dotted_section_names_resolve() {
    let config = parse("[tf2.eu]\npath = /srv/eu\n");

    assert_eq!(config.server("tf2.eu").unwrap().path, PathBuf::from("/srv/eu"));
  }

  #[test]
  fn section_names_are_case_sensitive() {
    let config = parse("[myserver]\npath = /srv/tf2\n");

    assert!(matches!(
      config.server("MyServer"),
      Err(ConfigurationError::UnknownServer(name)) if name == "MyServer"
    ));
  }

  #[test]
  fn option_keys_ignore_case() {
    let server = parse("[a]\nPath = /a\nPORT = 27016\n").resolve("a").unwrap();

    assert_eq!(server.path, PathBuf::from("/a"));
    assert_eq!(server.port, 27016);
  }

  #[test]
  fn invalid_port_is_rejected() {
    let config = parse("[a]\npath = /a\nport = seventy\n");

    assert!(matches!(
      config.resolve("a"),
      Err(ConfigurationError::InvalidPort { value, .. }) if value == "seventy"
    ));
  }

  #[test]
  fn defaults_come_from_default_section() {
    assert_eq!(
      parse(FULL).defaults().unwrap(),
      GlobalDefaults {
        ip: "10.0.0.1".to_string()
      }
    );
  }

  #[test]
  fn missing_default_section_is_named() {
    assert!(matches!(
      parse("[a]\npath = /a\n").defaults(),
      Err(ConfigurationError::MissingDefaultSection)
    ));
    assert!(matches!(
      parse("[default]\n[a]\npath = /a\n").defaults(),
      Err(ConfigurationError::MissingDefaultSection)
    ));
  }

  #[test]
  fn tilde_expands_to_home() {
    let config = parse("[a]\npath = ~/tf2\n[b]\npath = /opt/~tf2\n").with_home("/home/player");

    assert_eq!(config.server("a").unwrap().path, PathBuf::from("/home/player/tf2"));
    assert_eq!(config.server("b").unwrap().path, PathBuf::from("/opt/~tf2"));
  }

  #[test]
  fn missing_file_reports_its_path() {
    let path = env::temp_dir()
      .join(format!("tf2director-missing-{}", std::process::id()))
      .join(CONFIG_FILE_NAME);

    match DirectorConfig::load(&path) {
      Err(error @ ConfigurationError::MissingConfigFile(_)) => {
        assert!(error.to_string().contains(&path.display().to_string()));
      }
      other => panic!("unexpected result: {other:?}"),
    }
  }

  #[test]
  fn config_file_lives_in_home() {
    assert_eq!(
      config_file_path(Path::new("/home/player")),
      PathBuf::from("/home/player/tf2director.ini")
    );
  }
}
