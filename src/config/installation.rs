use crate::error::{Error, Result};
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Archive under `lib/` that carries the version descriptor.
const CORE_LIBRARY_ARCHIVE: &str = "catalina.jar";
/// Resource inside the core archive holding the server name and version.
const VERSION_DESCRIPTOR: &str = "org/apache/catalina/util/ServerInfo.properties";
/// Descriptor key for the display name, e.g. `Apache Tomcat/10.1.24`.
const KEY_SERVER_INFO: &str = "server.info";
/// Descriptor key for the version string, e.g. `10.1.24.0`.
const KEY_SERVER_NUMBER: &str = "server.number";

/// A validated server installation directory.
///
/// Instances are created by [`ServerInstallation::resolve`] and are immutable
/// afterwards: the home directory has been checked for the `bin/` and `lib/`
/// subtrees, and the version has been read out of the core library archive.
/// The installation itself is only ever read, never written, so a single
/// resolved value can back any number of concurrent launches.
///
/// # Examples
///
/// ```no_run
/// use catalina_runner::config::ServerInstallation;
///
/// let installation = ServerInstallation::resolve("/opt/tomcat")?;
/// println!("{} ({})", installation.name(), installation.version());
/// # Ok::<(), catalina_runner::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct ServerInstallation {
    home: PathBuf,
    name: String,
    version: String,
    major: u32,
}

impl ServerInstallation {
    /// Validates a server home directory and reads its version descriptor.
    ///
    /// # Arguments
    ///
    /// * `home` - Path to the installation root (the directory containing `bin/` and `lib/`)
    ///
    /// # Errors
    ///
    /// Returns `Error::InstallationInvalid` if:
    /// * `home` is not a directory, or `bin/` or `lib/` is missing beneath it
    /// * The core library archive is absent or not a readable archive
    /// * The version descriptor is missing or does not carry a parseable version
    ///
    /// Returns `Error::UnsupportedVersion` if the major version is below 6.
    pub fn resolve(home: impl AsRef<Path>) -> Result<Self> {
        let home = home.as_ref();
        if !home.is_dir() {
            return Err(Error::InstallationInvalid(format!(
                "Not a directory: {}",
                home.display()
            )));
        }
        for required in ["bin", "lib"] {
            if !home.join(required).is_dir() {
                return Err(Error::InstallationInvalid(format!(
                    "Missing {}/ under {}",
                    required,
                    home.display()
                )));
            }
        }

        let descriptor = read_version_descriptor(&home.join("lib").join(CORE_LIBRARY_ARCHIVE))?;
        let properties = parse_properties(&descriptor);
        let name = properties.get(KEY_SERVER_INFO).cloned().ok_or_else(|| {
            Error::InstallationInvalid(format!(
                "Version descriptor has no {} entry",
                KEY_SERVER_INFO
            ))
        })?;
        let version = properties.get(KEY_SERVER_NUMBER).cloned().ok_or_else(|| {
            Error::InstallationInvalid(format!(
                "Version descriptor has no {} entry",
                KEY_SERVER_NUMBER
            ))
        })?;
        let major = parse_major(&version)?;
        // Reject unsupported tiers before handing out an installation at all.
        VersionTier::from_major(major)?;

        tracing::debug!(name = %name, version = %version, "Resolved server installation");
        Ok(Self {
            home: home.to_path_buf(),
            name,
            version,
            major,
        })
    }

    /// Installation root directory.
    pub fn home(&self) -> &Path {
        &self.home
    }

    /// Display name from the version descriptor, e.g. `Apache Tomcat/10.1.24`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Full version string, e.g. `10.1.24.0`.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Leading numeric segment of the version string.
    pub fn major(&self) -> u32 {
        self.major
    }

    /// The resource-mounting strategy for this server generation.
    pub fn tier(&self) -> Result<VersionTier> {
        VersionTier::from_major(self.major)
    }

    /// The `bin/` directory holding the bootstrap archives.
    pub fn bin_dir(&self) -> PathBuf {
        self.home.join("bin")
    }

    /// The `lib/` directory holding the server's own libraries.
    pub fn lib_dir(&self) -> PathBuf {
        self.home.join("lib")
    }

    /// The template `conf/` directory copied into each working area.
    pub fn conf_dir(&self) -> PathBuf {
        self.home.join("conf")
    }
}

/// Resource-mounting strategy, keyed by server generation.
///
/// Servers before major version 8 know a single extension point, a custom
/// loader with a flat virtual classpath string. From 8 on, layered resource
/// roots can overlay directories and jars onto the packaged webapp. Majors
/// below 6 have no tier and are rejected outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionTier {
    /// Majors 6 and 7: a loader element with a `;`-joined virtual classpath.
    ClassicLoader,
    /// Major 8 and newer: a `Resources` element with pre/post resource sets.
    LayeredResources,
}

impl VersionTier {
    /// Derives the tier for a major version.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnsupportedVersion` for majors below 6.
    pub fn from_major(major: u32) -> Result<Self> {
        match major {
            0..=5 => Err(Error::UnsupportedVersion(format!(
                "Server major version {} is below the minimum supported version 6",
                major
            ))),
            6 | 7 => Ok(VersionTier::ClassicLoader),
            _ => Ok(VersionTier::LayeredResources),
        }
    }
}

fn read_version_descriptor(archive_path: &Path) -> Result<String> {
    let file = File::open(archive_path).map_err(|e| {
        Error::InstallationInvalid(format!(
            "Cannot open core library archive {}: {}",
            archive_path.display(),
            e
        ))
    })?;
    let mut archive = zip::ZipArchive::new(file).map_err(|e| {
        Error::InstallationInvalid(format!(
            "Cannot read core library archive {}: {}",
            archive_path.display(),
            e
        ))
    })?;
    let mut entry = archive.by_name(VERSION_DESCRIPTOR).map_err(|e| {
        Error::InstallationInvalid(format!(
            "Version descriptor {} not found in {}: {}",
            VERSION_DESCRIPTOR,
            archive_path.display(),
            e
        ))
    })?;
    let mut content = String::new();
    entry.read_to_string(&mut content).map_err(|e| {
        Error::InstallationInvalid(format!("Cannot read version descriptor: {}", e))
    })?;
    Ok(content)
}

/// Minimal Java-properties parsing, enough for the version descriptor.
/// Comment lines start with `#` or `!`; keys are split on the first `=` or `:`.
fn parse_properties(content: &str) -> HashMap<String, String> {
    let mut properties = HashMap::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
            continue;
        }
        if let Some(pos) = line.find(['=', ':']) {
            let key = line[..pos].trim().to_string();
            let value = line[pos + 1..].trim().to_string();
            properties.insert(key, value);
        }
    }
    properties
}

fn parse_major(version: &str) -> Result<u32> {
    version
        .split('.')
        .next()
        .and_then(|segment| segment.trim().parse::<u32>().ok())
        .ok_or_else(|| {
            Error::InstallationInvalid(format!(
                "Version string '{}' has no leading numeric segment",
                version
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_properties() {
        let content = "# comment\n! also a comment\nserver.info=Apache Tomcat/10.1.24\nserver.number: 10.1.24.0\n\n";
        let properties = parse_properties(content);
        assert_eq!(
            properties.get("server.info"),
            Some(&"Apache Tomcat/10.1.24".to_string())
        );
        assert_eq!(
            properties.get("server.number"),
            Some(&"10.1.24.0".to_string())
        );
    }

    #[test]
    fn test_parse_major() {
        assert_eq!(parse_major("10.1.24.0").unwrap(), 10);
        assert_eq!(parse_major("6.0.53").unwrap(), 6);
        assert!(parse_major("unknown").is_err());
    }

    #[test]
    fn test_version_tiers() {
        assert!(matches!(
            VersionTier::from_major(6),
            Ok(VersionTier::ClassicLoader)
        ));
        assert!(matches!(
            VersionTier::from_major(7),
            Ok(VersionTier::ClassicLoader)
        ));
        assert!(matches!(
            VersionTier::from_major(8),
            Ok(VersionTier::LayeredResources)
        ));
        assert!(matches!(
            VersionTier::from_major(11),
            Ok(VersionTier::LayeredResources)
        ));
        assert!(matches!(
            VersionTier::from_major(5),
            Err(Error::UnsupportedVersion(_))
        ));
    }
}
