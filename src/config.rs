use crate::Story;

use clap::{crate_authors, crate_description, crate_name, crate_version};
use clap::{App, Arg};
use color_eyre::Result;
use eyre::eyre;
use eyre::WrapErr;
use json_comments::StripComments;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::Write;
use tracing::debug;

use termcolor::ColorChoice;

use std::path::{Path, PathBuf};

/// The kind of output to produce
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Target {
    /// A Twine 2 HTML document built from a story format
    Html,

    /// Twee 3 source
    Twee,

    /// Story JSON
    Json,

    /// A Twine 2 archive holding every input story
    Archive,
}

impl Target {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "html" => Some(Target::Html),
            "twee" => Some(Target::Twee),
            "json" => Some(Target::Json),
            "archive" => Some(Target::Archive),
            _ => None,
        }
    }

    /// The extension of output files of this kind
    pub fn extension(self) -> &'static str {
        match self {
            Target::Html | Target::Archive => "html",
            Target::Twee => "twee",
            Target::Json => "json",
        }
    }
}

/// Represents a unified configuration for a run of tweeconv.
///
/// Compiled from the configuration file and command-line arguments given
pub struct Config {
    /// True if this is a lint-only run
    pub linting: bool,

    /// Input file(s)/director(y/ies)
    pub inputs: Vec<String>,

    /// What to convert the inputs to
    pub target: Target,

    /// The story format name or path given on the command line, if any
    pub format: Option<String>,

    /// Story format files found in the configured format paths, by name
    pub formats: HashMap<String, PathBuf>,

    /// Output file, if necessary/given
    pub output_file: Option<String>,

    /// True if the output should be sent to `opener`
    pub should_open: bool,

    /// List of allowed (ignored) warning names
    pub allowed: Vec<String>,

    /// List of denied (treated as errors) warning names
    pub denied: Vec<String>,

    /// Whether or not to use color output
    pub use_color: ColorChoice,

    /// If true, use compact output format
    pub compact: bool,
}

impl Config {
    /// Loads the [`ConfigFile`], parses the [`CliConfig`], and produces a
    /// unified `Config`
    ///
    /// [`CliConfig`]: struct.CliConfig.html
    /// [`ConfigFile`]: struct.ConfigFile.html
    pub fn build() -> Result<Self> {
        let config_file = ConfigFile::load()?;
        let cli_config = CliConfig::from_args();
        Ok(Config::layer(config_file, cli_config))
    }

    /// Creates a unified `Config` file from the given [`ConfigFile`] and
    /// [`CliConfig`]
    ///
    /// Allow and deny lists from the `default` format config, then from the
    /// config of the format named on the command line, are appended to the
    /// command line lists.
    ///
    /// [`CliConfig`]: struct.CliConfig.html
    /// [`ConfigFile`]: struct.ConfigFile.html
    pub fn layer(config_file: ConfigFile, cli_config: CliConfig) -> Self {
        let format_configs: Vec<&FormatConfig> = std::iter::once("default")
            .chain(cli_config.format.as_deref())
            .filter_map(|name| config_file.format_configs.get(name))
            .collect();

        let mut allowed = cli_config.allowed;
        let mut denied = cli_config.denied;
        for format_config in format_configs {
            allowed.extend(format_config.allow.iter().cloned());
            denied.extend(format_config.deny.iter().cloned());
        }

        Config {
            linting: cli_config.linting,
            inputs: cli_config.inputs,
            target: cli_config.target,
            format: cli_config.format,
            formats: config_file.formats,
            output_file: cli_config.output_file,
            should_open: cli_config.should_open,
            allowed,
            denied,
            use_color: cli_config.use_color,
            compact: cli_config.compact,
        }
    }

    /// Picks the story format file to compile the given story with
    ///
    /// A format given on the command line is looked up by name, then used as
    /// a path. Otherwise the story's own format is looked up, first as
    /// `<name>-<major version>` (e.g. `harlowe-3`), then by name alone.
    /// Falls back to `format.js`.
    pub fn format_file(&self, story: &Story) -> PathBuf {
        if let Some(format) = &self.format {
            return self
                .formats
                .get(format)
                .cloned()
                .unwrap_or_else(|| format.into());
        }

        let name = story.format.to_lowercase().replace(' ', "-");
        let major = story.format_version.split('.').next().unwrap_or_default();
        let candidates = [format!("{}-{}", name, major), name];
        candidates
            .iter()
            .find_map(|candidate| self.formats.get(candidate))
            .cloned()
            .unwrap_or_else(|| "format.js".into())
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct FormatConfig {
    #[serde(default)]
    pub allow: Vec<String>,
    #[serde(default)]
    pub deny: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct ConfigFileInternal {
    #[serde(default)]
    pub format_paths: Vec<String>,
    #[serde(default)]
    pub format_configs: HashMap<String, FormatConfig>,
}

/// Stores format paths and settings parsed from the tweeconv config file
#[derive(Debug, Default)]
pub struct ConfigFile {
    /// Maps formats to paths based on the name of the containing directories
    pub formats: HashMap<String, PathBuf>,

    /// Maps a format (or default) to a config to use for that format
    pub format_configs: HashMap<String, FormatConfig>,
}

const DEFAULT_CONFIG: &str = r#"// This file defines the configuration for tweeconv
// It is mostly standard JSON, but supports //, /**/, and # style comments.
//
// For path related configuration, tweeconv defines several special variables
// that can be used to specify locations:
// * $TWEECONV_BIN_DIR: directory in which the tweeconv executable is located
// * $TWEECONV_DATA_DIR: tweeconv's system data dir (OS-specific)
// * $PWD: directory from which tweeconv is being invoked
// * $HOME: user's home directory (~ is not currently supported)
//
// Arbitrary environment variables are not currently supported
{
  // Directories to search for story formats in. Each format lives in its own
  // directory (e.g. harlowe-3/format.js) and is known by that directory's name
  "format_paths": [
    "$TWEECONV_DATA_DIR/storyformats",
    "$TWEECONV_DATA_DIR/.storyformats",
    "$TWEECONV_BIN_DIR/storyformats",
    "$TWEECONV_BIN_DIR/.storyformats",
    "$HOME/storyformats",
    "$HOME/.storyformats",
    "$PWD/storyformats",
    "$PWD/.storyformats"
  ],
  "format_configs": {
    // This is the default configuration which other configurations will be
    // layered over. Config items defined in story format-specific config chunks
    // will be appended to the values given in default.
    "default": {
      // Warnings to ignore ("allow")
      "allow": [],
      // Warnings to treat as errors ("deny")
      "deny": []
    },
    "harlowe-3": {
      // Harlowe stories are usually started from a passage named Start
      "deny": [ "StartPassageNotFound" ]
    }
  }
}"#;

/// Replaces the supported `$VARIABLE`s in a configured path
fn expand_variables(raw: &str) -> Result<String> {
    let mut path = raw.to_string();

    while let Some(start) = path.find('$') {
        let end = path[start..]
            .find('/')
            .map(|pos| start + pos)
            .unwrap_or_else(|| path.len());

        // Including the $
        let var = path[start..end].to_string();

        // Excluding the $
        let replace = match &var[1..] {
            "HOME" => dirs_next::home_dir().ok_or_else(|| eyre!("Failed to get HOME")),
            "PWD" => std::env::current_dir().wrap_err_with(|| "Failed to get PWD"),
            "TWEECONV_BIN_DIR" => match std::env::current_exe() {
                Ok(ok) => ok
                    .parent()
                    .map(|p| p.to_path_buf())
                    .ok_or_else(|| eyre!("Failed to get tweeconv executable's parent")),
                Err(err) => Err(err).wrap_err_with(|| "Failed to get TWEECONV_BIN_DIR"),
            },
            "TWEECONV_DATA_DIR" => dirs_next::data_dir()
                .map(|p| p.join(crate_name!()))
                .ok_or_else(|| eyre!("Failed to get TWEECONV_DATA_DIR")),
            _ => Err(eyre!(
                "Arbitrary environment variables are not currently supported"
            )),
        }
        .map(|p| p.into_os_string().to_string_lossy().into_owned())
        .wrap_err_with(|| format!("Error while parsing {}", raw))?;
        path = path.replace(&var, &replace);
    }

    Ok(path)
}

/// Adds every `<dir>/format.js` under `path` to `formats`, keyed by `<dir>`.
/// Formats found earlier win
fn discover_formats(path: &Path, formats: &mut HashMap<String, PathBuf>) -> Result<()> {
    // Continue without error if the path doesn't exist or isn't a directory
    if !path.is_dir() {
        debug!(?path, "Skipping missing story format directory");
        return Ok(());
    }

    let formats_dir = std::fs::read_dir(path)
        .wrap_err_with(|| format!("Error while reading directory {:?}", path))?;
    for entry in formats_dir.flatten() {
        let format_path = entry.path();
        let format_file = format_path.join("format.js");
        if !format_file.is_file() {
            continue;
        }

        if let Some(dir_name) = format_path.file_name() {
            let dir_name = dir_name.to_string_lossy().into_owned();
            debug!(name = %dir_name, path = ?format_file, "Found story format");
            formats.entry(dir_name).or_insert(format_file);
        }
    }

    Ok(())
}

impl ConfigFile {
    /// Loads the config file
    ///
    /// If the config file does not exist, it will try to create a default one
    /// in the config directory. Also searches for all Twine 2 formats in the
    /// paths specified by the config file
    pub fn load() -> Result<Self> {
        let config_path = dirs_next::config_dir()
            .ok_or_else(|| eyre!("Error getting config directory"))?
            .join(crate_name!())
            .join("config.json");

        let config_contents = if !config_path.exists() {
            if let Some(prefix) = config_path.parent() {
                std::fs::create_dir_all(prefix)
                    .wrap_err_with(|| format!("Error creating config directory: {:?}", prefix))?;
            }
            let mut config_file = File::create(&config_path)?;
            config_file.write_all(DEFAULT_CONFIG.as_bytes())?;

            DEFAULT_CONFIG.to_string()
        } else {
            std::fs::read_to_string(&config_path)
                .wrap_err_with(|| format!("Error reading config file: {:?}", config_path))?
        };

        ConfigFile::parse(&config_contents)
            .wrap_err_with(|| format!("Error parsing config file: {:?}", config_path))
    }

    /// Parses config file contents and searches the format paths it names
    pub fn parse(contents: &str) -> Result<Self> {
        // Strip the comments from the input (use `as_bytes()` to get a `Read`).
        let stripped = StripComments::new(contents.as_bytes());
        let cf: ConfigFileInternal = serde_json::from_reader(stripped)?;
        debug!(?cf, "Loaded config file");

        let mut formats = HashMap::new();
        for format_path in &cf.format_paths {
            let path = expand_variables(format_path)?;
            discover_formats(Path::new(&path), &mut formats)?;
        }

        Ok(ConfigFile {
            formats,
            format_configs: cf.format_configs,
        })
    }
}

/// The command line options supplied by the user
pub struct CliConfig {
    /// If true, lint then exit
    pub linting: bool,

    /// Input files or directories to lint/convert
    pub inputs: Vec<String>,

    /// What to convert the inputs to
    pub target: Target,

    /// The story format name or path
    pub format: Option<String>,

    /// The file name to output. Defaults to <story name>.<extension>
    pub output_file: Option<String>,

    /// If true, send the output file to `opener` for the user
    pub should_open: bool,

    /// List of allowed (ignored) warnings, by name
    pub allowed: Vec<String>,

    /// List of denied (treated as errors) warnings, by name
    pub denied: Vec<String>,

    /// Controls color output
    pub use_color: ColorChoice,

    /// If true, use compact warning and error output
    pub compact: bool,
}

impl CliConfig {
    /// Parses the command line arguments
    pub fn from_args() -> Self {
        #[allow(deprecated, dangerous_implicit_autorefs)]
        let m = App::new(crate_name!())
            .about(crate_description!())
            .author(crate_authors!("\n"))
            .version(crate_version!())
            .arg(
                Arg::with_name("allow")
                    .help("Specifies warnings to ignore. Overrides deny.")
                    .short("a")
                    .long("allow")
                    .takes_value(true)
                    .multiple(true),
            )
            .arg(
                Arg::with_name("color")
                    .help("Turns on colored output")
                    .long("color")
                    .takes_value(true),
            )
            .arg(
                Arg::with_name("compact")
                    .help("Turns on compact error and warning output")
                    .long("compact"),
            )
            .arg(
                Arg::with_name("deny")
                    .help("Specifies warnings to treat as errors")
                    .short("D")
                    .long("deny")
                    .takes_value(true)
                    .multiple(true),
            )
            .arg(
                Arg::with_name("format")
                    .help("Sets the story format by name (e.g., sugarcube-2) or file location")
                    .short("f")
                    .long("format")
                    .takes_value(true),
            )
            .arg(
                Arg::with_name("lint")
                    .help("Runs the linter without producing any output")
                    .short("L")
                    .long("lint"),
            )
            .arg(
                Arg::with_name("open")
                    .help("Opens the output in a web browser")
                    .long("open")
                    .conflicts_with("lint"),
            )
            .arg(
                Arg::with_name("output")
                    .help("Sets the output file (default: <Story Title>.<extension>)")
                    .short("o")
                    .long("output")
                    .takes_value(true)
                    .conflicts_with("lint"),
            )
            .arg(
                Arg::with_name("to")
                    .help("Sets the output kind")
                    .short("t")
                    .long("to")
                    .takes_value(true)
                    .possible_values(&["html", "twee", "json", "archive"])
                    .default_value("html"),
            )
            .arg(
                Arg::with_name("INPUT")
                    .help("Sets the input file(s) or directory(s) to use")
                    .required(true)
                    .multiple(true)
                    .index(1),
            )
            .get_matches();

        let linting = m.is_present("lint");
        let inputs: Vec<String> = m
            .values_of("INPUT")
            .unwrap_or_default()
            .map(|s| s.to_string())
            .collect();
        let target = m
            .value_of("to")
            .and_then(Target::from_name)
            .unwrap_or(Target::Html);
        let format = m.value_of("format").map(|s| s.to_string());
        let output_file = m.value_of("output").map(|s| s.to_string());
        let should_open = m.is_present("open");
        let allowed = m
            .values_of("allow")
            .unwrap_or_default()
            .map(|s| s.to_string())
            .collect();
        let denied = m
            .values_of("deny")
            .unwrap_or_default()
            .map(|s| s.to_string())
            .collect();
        let use_color = match m.value_of("color").unwrap_or("auto") {
            "always" => ColorChoice::Always,
            "ansi" => ColorChoice::AlwaysAnsi,
            "auto" => {
                if atty::is(atty::Stream::Stdout) {
                    ColorChoice::Auto
                } else {
                    ColorChoice::Never
                }
            }
            _ => ColorChoice::Never,
        };
        let compact = m.is_present("compact");

        CliConfig {
            linting,
            inputs,
            target,
            format,
            output_file,
            should_open,
            allowed,
            denied,
            use_color,
            compact,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli_config(format: Option<&str>) -> CliConfig {
        CliConfig {
            linting: false,
            inputs: vec!["story.twee".to_string()],
            target: Target::Html,
            format: format.map(|f| f.to_string()),
            output_file: None,
            should_open: false,
            allowed: vec!["DuplicatePassage".to_string()],
            denied: Vec::new(),
            use_color: ColorChoice::Never,
            compact: true,
        }
    }

    fn config_file() -> ConfigFile {
        let cf = ConfigFile::parse(
            r#"// comment
            {
              "format_paths": [],
              "format_configs": {
                "default": { "allow": ["MissingHtmlAttribute"] },
                "harlowe-3": { "deny": ["StartPassageNotFound"] }
              }
            }"#,
        )
        .unwrap();
        let mut formats = HashMap::new();
        formats.insert("harlowe-3".to_string(), PathBuf::from("/formats/harlowe-3/format.js"));
        formats.insert("snowman".to_string(), PathBuf::from("/formats/snowman/format.js"));
        ConfigFile {
            formats,
            format_configs: cf.format_configs,
        }
    }

    #[test]
    fn layering() {
        let config = Config::layer(config_file(), cli_config(Some("harlowe-3")));
        assert_eq!(config.allowed, vec!["DuplicatePassage", "MissingHtmlAttribute"]);
        assert_eq!(config.denied, vec!["StartPassageNotFound"]);

        let config = Config::layer(config_file(), cli_config(None));
        assert!(config.denied.is_empty());
    }

    #[test]
    fn format_from_command_line() {
        let config = Config::layer(config_file(), cli_config(Some("harlowe-3")));
        assert_eq!(
            config.format_file(&Story::default()),
            PathBuf::from("/formats/harlowe-3/format.js")
        );

        let config = Config::layer(config_file(), cli_config(Some("my/format.js")));
        assert_eq!(
            config.format_file(&Story::default()),
            PathBuf::from("my/format.js")
        );
    }

    #[test]
    fn format_from_story() {
        let config = Config::layer(config_file(), cli_config(None));

        let mut story = Story::default();
        story.format = "Harlowe".to_string();
        story.format_version = "3.3.8".to_string();
        assert_eq!(
            config.format_file(&story),
            PathBuf::from("/formats/harlowe-3/format.js")
        );

        story.format = "Snowman".to_string();
        assert_eq!(
            config.format_file(&story),
            PathBuf::from("/formats/snowman/format.js")
        );

        story.format = "Chapbook".to_string();
        assert_eq!(config.format_file(&story), PathBuf::from("format.js"));
    }

    #[test]
    fn variables() {
        assert!(expand_variables("$NOPE/formats").is_err());
        let pwd = std::env::current_dir().unwrap();
        assert_eq!(
            expand_variables("$PWD/formats").unwrap(),
            format!("{}/formats", pwd.to_string_lossy())
        );
        assert_eq!(expand_variables("/plain").unwrap(), "/plain");
    }

    #[test]
    fn target_names() {
        assert_eq!(Target::from_name("twee"), Some(Target::Twee));
        assert_eq!(Target::from_name("pdf"), None);
        assert_eq!(Target::Archive.extension(), "html");
    }
}
