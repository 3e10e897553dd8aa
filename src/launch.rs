//! Assembly of the Java command line that boots the server.

use crate::conf::WorkingArea;
use crate::config::{RunnerSettings, ServerInstallation};
use crate::error::{Error, Result};
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};

/// Entry point class of the server's bootstrap archive.
pub const BOOTSTRAP_MAIN_CLASS: &str = "org.apache.catalina.startup.Bootstrap";

/// Archives from the installation's `bin/` that form the base classpath,
/// in classpath order.
const BOOTSTRAP_JARS: [&str; 2] = ["bootstrap.jar", "tomcat-juli.jar"];

/// Module opens required by the server's reflective access on modern JDKs.
/// Passed through `JDK_JAVA_OPTIONS` so older JDKs, which ignore the
/// variable, are unaffected.
const JPMS_OPENS: &str = "--add-opens=java.base/java.lang=ALL-UNNAMED \
--add-opens=java.base/java.io=ALL-UNNAMED \
--add-opens=java.base/java.util=ALL-UNNAMED \
--add-opens=java.base/java.util.concurrent=ALL-UNNAMED \
--add-opens=java.rmi/sun.rmi.transport=ALL-UNNAMED";

const JDK_JAVA_OPTIONS_VAR: &str = "JDK_JAVA_OPTIONS";

/// A fully resolved description of the process to launch.
///
/// Building the spec touches the filesystem (to verify bootstrap archives
/// and locate `java`) but starts nothing; the spec can be inspected, logged,
/// or handed to the process supervisor as-is.
#[derive(Debug, Clone)]
pub struct LaunchSpec {
    /// Resolved `java` executable, or the bare name for `PATH` lookup.
    pub java: PathBuf,
    /// Directory the process runs in, the working area root.
    pub working_dir: PathBuf,
    /// Classpath entries in order.
    pub classpath: Vec<PathBuf>,
    /// VM options in order, user options first, mandatory properties last.
    pub vm_options: Vec<String>,
    /// Environment overrides applied on top of the inherited environment.
    pub env: HashMap<String, String>,
    /// Class whose `main` is invoked.
    pub main_class: String,
    /// Arguments after the main class.
    pub program_args: Vec<String>,
    /// Whether the child inherits the parent process environment.
    pub pass_parent_env: bool,
}

impl LaunchSpec {
    /// Classpath entries joined with the platform path-list separator.
    pub fn classpath_string(&self) -> String {
        let sep = if cfg!(windows) { ";" } else { ":" };
        self.classpath
            .iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join(sep)
    }
}

/// Builds the launch spec for an installation, settings, and working area.
///
/// The command line is assembled in a fixed order:
///
/// * Classpath: `bin/bootstrap.jar`, `bin/tomcat-juli.jar`, then the user's
///   extra classpath entries. A missing bootstrap archive fails with
///   `InstallationInvalid`.
/// * VM options: the user's raw options (whitespace-split with double-quote
///   support), then the mandatory `catalina.home`, `catalina.base`,
///   `java.io.tmpdir`, and logging properties. Mandatory properties come
///   last so they win over user-supplied values of the same keys.
/// * `JDK_JAVA_OPTIONS` is extended, never replaced, with the module opens
///   the server needs on JDK 9+.
///
/// The `java` executable comes from the configured Java home, then the
/// `JAVA_HOME` environment variable, then `PATH` lookup of plain `java`.
///
/// # Errors
///
/// Returns `Error::InstallationInvalid` when a bootstrap archive is missing
/// and `Error::ConfigInvalid` when the configured Java home holds no `java`
/// executable.
pub fn build_launch_spec(
    installation: &ServerInstallation,
    settings: &RunnerSettings,
    area: &WorkingArea,
) -> Result<LaunchSpec> {
    let mut classpath = Vec::with_capacity(BOOTSTRAP_JARS.len());
    for jar in BOOTSTRAP_JARS {
        let path = installation.bin_dir().join(jar);
        if !path.is_file() {
            return Err(Error::InstallationInvalid(format!(
                "Missing bootstrap archive {}",
                path.display()
            )));
        }
        classpath.push(path);
    }
    classpath.extend(split_path_list(&settings.extra_classpath));

    let mut vm_options = split_vm_options(&settings.vm_options);
    vm_options.push(format!("-Dcatalina.home={}", installation.home().display()));
    vm_options.push(format!("-Dcatalina.base={}", area.root().display()));
    vm_options.push(format!("-Djava.io.tmpdir={}", area.temp().display()));
    vm_options.push(format!(
        "-Djava.util.logging.config.file={}",
        area.conf().join("logging.properties").display()
    ));
    vm_options
        .push("-Djava.util.logging.manager=org.apache.juli.ClassLoaderLogManager".to_string());

    let mut env = settings.env.clone();
    let inherited = if settings.pass_parent_env {
        env::var(JDK_JAVA_OPTIONS_VAR).ok()
    } else {
        None
    };
    let existing = env.get(JDK_JAVA_OPTIONS_VAR).cloned().or(inherited);
    let merged = match existing {
        Some(value) if !value.trim().is_empty() => format!("{} {}", value, JPMS_OPENS),
        _ => JPMS_OPENS.to_string(),
    };
    env.insert(JDK_JAVA_OPTIONS_VAR.to_string(), merged);

    Ok(LaunchSpec {
        java: resolve_java(settings)?,
        working_dir: area.root().to_path_buf(),
        classpath,
        vm_options,
        env,
        main_class: BOOTSTRAP_MAIN_CLASS.to_string(),
        program_args: vec!["start".to_string()],
        pass_parent_env: settings.pass_parent_env,
    })
}

/// Splits a raw VM options string on whitespace, honoring double quotes.
/// Quotes group whitespace into one option and are stripped from the result.
fn split_vm_options(raw: &str) -> Vec<String> {
    let mut options = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    for ch in raw.chars() {
        match ch {
            '"' => in_quotes = !in_quotes,
            c if c.is_whitespace() && !in_quotes => {
                if !current.is_empty() {
                    options.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        options.push(current);
    }
    options
}

/// Splits a path-list string on the platform separator, dropping empty
/// segments.
fn split_path_list(raw: &str) -> Vec<PathBuf> {
    env::split_paths(raw)
        .filter(|p| !p.as_os_str().is_empty())
        .collect()
}

fn resolve_java(settings: &RunnerSettings) -> Result<PathBuf> {
    if let Some(java_home) = &settings.java_home {
        let java = java_executable(java_home);
        if java.is_file() {
            return Ok(java);
        }
        return Err(Error::ConfigInvalid(format!(
            "No java executable under {}",
            java_home.display()
        )));
    }
    if let Ok(java_home) = env::var("JAVA_HOME") {
        let java = java_executable(Path::new(&java_home));
        if java.is_file() {
            return Ok(java);
        }
    }
    Ok(PathBuf::from("java"))
}

fn java_executable(java_home: &Path) -> PathBuf {
    let name = if cfg!(windows) { "java.exe" } else { "java" };
    java_home.join("bin").join(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_vm_options_plain() {
        assert_eq!(
            split_vm_options("-Xmx512m -Dfoo=bar"),
            vec!["-Xmx512m", "-Dfoo=bar"]
        );
    }

    #[test]
    fn test_split_vm_options_quoted() {
        assert_eq!(
            split_vm_options(r#"-Dgreeting="hello world" -Xms64m"#),
            vec!["-Dgreeting=hello world", "-Xms64m"]
        );
    }

    #[test]
    fn test_split_vm_options_blank() {
        assert!(split_vm_options("").is_empty());
        assert!(split_vm_options("   ").is_empty());
    }

    #[test]
    fn test_split_path_list_drops_empty_segments() {
        let sep = if cfg!(windows) { ";" } else { ":" };
        let raw = format!("/opt/a{0}{0}/opt/b.jar", sep);
        assert_eq!(
            split_path_list(&raw),
            vec![PathBuf::from("/opt/a"), PathBuf::from("/opt/b.jar")]
        );
    }
}
