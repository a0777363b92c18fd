//! Loads the site configuration from a `wikistatic.yaml` project file. The
//! resulting [`Config`] is built once at startup and passed by reference to
//! everything that needs it.

use crate::util::escape_html;
use anyhow::{anyhow, Result};
use chrono::format::{Item, StrftimeItems};
use serde::Deserialize;
use std::io::Read;
use std::path::{Path, PathBuf};
use url::Url;

pub const PROJECT_FILE_NAME: &str = "wikistatic.yaml";

#[derive(Deserialize)]
struct DateFormat(String);
impl Default for DateFormat {
    fn default() -> Self {
        DateFormat(String::from("%B %-d, %Y"))
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct Project {
    pub site_name: String,
    #[serde(default)]
    pub home_heading: Option<String>,
    pub site_url: Url,
    pub home_url: Url,
    pub wiki_url: Url,
    #[serde(default)]
    pub wiki_repository: Option<PathBuf>,

    pub publisher_name: String,
    pub publisher_url: Url,
    pub publisher_logo_url: Url,
    pub license_url: Url,
    pub stylesheet_url: Url,
    pub mathjax_config_script_url: Url,
    pub mirror_repository_url: Url,

    #[serde(default)]
    pub display_date_format: DateFormat,
    #[serde(default)]
    pub template: Option<PathBuf>,
    #[serde(default)]
    pub output_directory: Option<PathBuf>,
}

/// The site configuration. Paths are absolute (resolved against the
/// directory holding the project file).
#[derive(Clone, Debug)]
pub struct Config {
    /// The site's name. Titles starting with it are meta pages (e.g. "About
    /// <site name>") and are left out of the home page listing.
    pub site_name: String,

    /// The heading of the home page.
    pub home_heading: String,

    /// The canonical root of the static site; page URLs are children of it.
    pub site_url: Url,

    /// The URL the home page and internal links are served under.
    pub home_url: Url,

    /// The URL of the wiki itself; "view source" links are children of it.
    pub wiki_url: Url,

    /// The git repository holding the wiki pages.
    pub wiki_repository: PathBuf,

    pub publisher_name: String,
    pub publisher_url: Url,
    pub publisher_logo_url: Url,
    pub license_url: Url,
    pub stylesheet_url: Url,
    pub mathjax_config_script_url: Url,

    /// A browsable mirror of the wiki repository; author links point at
    /// `{mirror_repository_url}/commit/{id}`.
    pub mirror_repository_url: Url,

    /// A `strftime` format string for human-readable dates.
    pub display_date_format: String,

    pub template: PathBuf,
    pub output_directory: PathBuf,
}

impl Config {
    /// Searches `dir` and its ancestors for a `wikistatic.yaml` file and
    /// loads it. `output_directory` overrides the configured output
    /// directory.
    pub fn from_directory(dir: &Path, output_directory: Option<&Path>) -> Result<Config> {
        let path = dir.join(PROJECT_FILE_NAME);
        if path.exists() {
            Config::from_project_file(&path, output_directory)
                .map_err(|e| anyhow!("Loading configuration: {:?}", e))
        } else {
            match dir.parent() {
                Some(parent) => Config::from_directory(parent, output_directory),
                None => Err(anyhow!(
                    "Could not find `{}` in any parent directory",
                    PROJECT_FILE_NAME
                )),
            }
        }
    }

    /// Loads the project file at `path`.
    pub fn from_project_file(path: &Path, output_directory: Option<&Path>) -> Result<Config> {
        use crate::util::open;
        let project_root = match path.parent() {
            Some(root) if root.as_os_str().is_empty() => std::env::current_dir()?,
            Some(root) => root.to_owned(),
            None => {
                return Err(anyhow!(
                    "Can't get parent directory for provided project file path '{:?}'",
                    path
                ))
            }
        };
        Config::from_reader(&project_root, open(path, "project")?, output_directory)
    }

    /// Parses a project file from `reader`. Relative paths in it are
    /// resolved against `project_root`.
    pub fn from_reader<R: Read>(
        project_root: &Path,
        reader: R,
        output_directory: Option<&Path>,
    ) -> Result<Config> {
        let project: Project = serde_yaml::from_reader(reader)?;
        validate_date_format(&project.display_date_format.0)?;

        Ok(Config {
            home_heading: project
                .home_heading
                .unwrap_or_else(|| project.site_name.clone()),
            site_name: project.site_name,
            site_url: project.site_url,
            home_url: project.home_url,
            wiki_url: project.wiki_url,
            wiki_repository: project_root.join(path_or(project.wiki_repository, "wiki")),
            publisher_name: project.publisher_name,
            publisher_url: project.publisher_url,
            publisher_logo_url: project.publisher_logo_url,
            license_url: project.license_url,
            stylesheet_url: project.stylesheet_url,
            mathjax_config_script_url: project.mathjax_config_script_url,
            mirror_repository_url: project.mirror_repository_url,
            display_date_format: project.display_date_format.0,
            template: project_root.join(path_or(project.template, "template.html")),
            output_directory: match output_directory {
                Some(dir) => dir.to_owned(),
                None => project_root.join(path_or(project.output_directory, "public")),
            },
        })
    }

    /// The site name, escaped for HTML.
    pub fn escaped_site_name(&self) -> String {
        escape_html(&self.site_name)
    }

    /// The publisher name, escaped for HTML.
    pub fn escaped_publisher_name(&self) -> String {
        escape_html(&self.publisher_name)
    }
}

fn path_or(path: Option<PathBuf>, default: &str) -> PathBuf {
    path.unwrap_or_else(|| PathBuf::from(default))
}

/// Rejects format strings `chrono` can't render. Formatting with an invalid
/// specifier panics, so this has to be caught before any page is rendered.
fn validate_date_format(format: &str) -> Result<()> {
    match StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
        true => Err(anyhow!("Invalid display_date_format '{}'", format)),
        false => Ok(()),
    }
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;

    pub(crate) const EXAMPLE: &str = r#"
site_name: Acme Wiki
site_url: https://wiki.acme.example/
home_url: https://wiki.acme.example/
wiki_url: https://github.com/acme/widgets/wiki
publisher_name: Acme & Co
publisher_url: https://acme.example/
publisher_logo_url: https://acme.example/logo.png
license_url: https://wiki.acme.example/LICENSE
stylesheet_url: https://wiki.acme.example/style.css
mathjax_config_script_url: https://wiki.acme.example/mathjax-config.js
mirror_repository_url: https://github.com/acme/widgets-wiki
"#;

    /// A configuration rooted at `/srv/acme`.
    pub(crate) fn example() -> Config {
        match Config::from_reader(Path::new("/srv/acme"), EXAMPLE.as_bytes(), None) {
            Ok(config) => config,
            Err(e) => panic!("example configuration: {:?}", e),
        }
    }

    #[test]
    fn test_defaults() {
        let config = example();
        assert_eq!("Acme Wiki", config.home_heading);
        assert_eq!("%B %-d, %Y", config.display_date_format);
        assert_eq!(PathBuf::from("/srv/acme/wiki"), config.wiki_repository);
        assert_eq!(PathBuf::from("/srv/acme/template.html"), config.template);
        assert_eq!(PathBuf::from("/srv/acme/public"), config.output_directory);
        assert_eq!("Acme &amp; Co", config.escaped_publisher_name());
    }

    #[test]
    fn test_overrides() -> Result<()> {
        let yaml = format!(
            "{}home_heading: Welcome\nwiki_repository: ../widgets.wiki\n\
             display_date_format: \"%Y-%m-%d\"\noutput_directory: site\n",
            EXAMPLE
        );
        let config = Config::from_reader(
            Path::new("/srv/acme"),
            yaml.as_bytes(),
            Some(Path::new("/tmp/out")),
        )?;
        assert_eq!("Welcome", config.home_heading);
        assert_eq!("%Y-%m-%d", config.display_date_format);
        assert_eq!(PathBuf::from("/srv/acme/../widgets.wiki"), config.wiki_repository);
        assert_eq!(PathBuf::from("/tmp/out"), config.output_directory);
        Ok(())
    }

    #[test]
    fn test_invalid_date_format() {
        let yaml = format!("{}display_date_format: \"%Q\"\n", EXAMPLE);
        assert!(Config::from_reader(Path::new("/"), yaml.as_bytes(), None).is_err());
    }

    #[test]
    fn test_missing_key() {
        let yaml = EXAMPLE.replace("site_name: Acme Wiki\n", "");
        assert!(Config::from_reader(Path::new("/"), yaml.as_bytes(), None).is_err());
    }

    #[test]
    fn test_unknown_key() {
        let yaml = format!("{}site_nmae: typo\n", EXAMPLE);
        assert!(Config::from_reader(Path::new("/"), yaml.as_bytes(), None).is_err());
    }
}
