use catalina_runner::config::{Config, DeploymentDescriptor, PortAssignment, RunnerSettings};
use catalina_runner::config::validator;
use catalina_runner::error::{Error, Result};
use std::collections::HashMap;
use std::path::PathBuf;

#[test]
fn test_parse_full_config() -> Result<()> {
    let config_str = r#"{
        "serverHome": "/opt/tomcat",
        "settings": {
            "vmOptions": "-Xmx512m",
            "env": {
                "SPRING_PROFILES_ACTIVE": "dev"
            },
            "javaHome": "/usr/lib/jvm/java-17"
        },
        "deployments": {
            "webapp": {
                "contextPath": "app",
                "docBase": "/home/dev/webapp/src/main/webapp",
                "classpath": ["/home/dev/webapp/target/classes", "/home/dev/libs/util.jar"],
                "ports": { "http": 9090, "shutdown": 9005 }
            },
            "admin": {
                "contextPath": "/shop/admin",
                "docBase": "/home/dev/admin/web"
            }
        }
    }"#;

    let config = Config::parse_from_str(config_str)?;

    assert_eq!(config.server_home, PathBuf::from("/opt/tomcat"));
    assert_eq!(config.settings.vm_options, "-Xmx512m");
    assert_eq!(
        config.settings.env.get("SPRING_PROFILES_ACTIVE"),
        Some(&"dev".to_string())
    );
    assert!(config.settings.pass_parent_env);
    assert_eq!(
        config.settings.java_home,
        Some(PathBuf::from("/usr/lib/jvm/java-17"))
    );
    assert_eq!(config.deployments.len(), 2);

    let webapp = &config.deployments["webapp"];
    // Context paths are normalized to a leading slash when parsed.
    assert_eq!(webapp.context_path, "/app");
    assert_eq!(webapp.classpath.len(), 2);
    assert_eq!(webapp.ports.http, 9090);
    assert_eq!(webapp.ports.shutdown, 9005);
    assert!(webapp.ports.ssl.is_none());

    let admin = &config.deployments["admin"];
    assert_eq!(admin.context_path, "/shop/admin");
    assert!(admin.classpath.is_empty());
    assert_eq!(admin.ports, PortAssignment::default());

    Ok(())
}

#[test]
fn test_parse_minimal_config_takes_defaults() -> Result<()> {
    let config_str = r#"{
        "serverHome": "/opt/tomcat",
        "deployments": {
            "webapp": {
                "contextPath": "/",
                "docBase": "/srv/webapp"
            }
        }
    }"#;

    let config = Config::parse_from_str(config_str)?;

    assert!(config.settings.vm_options.is_empty());
    assert!(config.settings.extra_classpath.is_empty());
    assert!(config.settings.env.is_empty());
    assert!(config.settings.pass_parent_env);
    assert!(config.settings.java_home.is_none());
    assert!(config.settings.work_dir.is_none());

    let webapp = &config.deployments["webapp"];
    assert_eq!(webapp.context_path, "/");
    assert_eq!(webapp.ports.http, 8080);
    assert_eq!(webapp.ports.shutdown, 8005);

    Ok(())
}

#[test]
fn test_parse_invalid_json() {
    let result = Config::parse_from_str("{ not json");
    assert!(matches!(result, Err(Error::ConfigParse(_))));
}

#[test]
fn test_descriptor_from_deployment_config() -> Result<()> {
    let dir = tempfile::tempdir().unwrap();
    let classes = dir.path().join("classes");
    std::fs::create_dir(&classes).unwrap();
    let jar = dir.path().join("util.jar");
    std::fs::write(&jar, b"jar").unwrap();

    let config_str = format!(
        r#"{{
            "serverHome": "/opt/tomcat",
            "deployments": {{
                "webapp": {{
                    "contextPath": "app",
                    "docBase": "/srv/webapp",
                    "classpath": [{:?}, {:?}]
                }}
            }}
        }}"#,
        classes, jar
    );

    let config = Config::parse_from_str(&config_str)?;
    let descriptor = config.deployments["webapp"].to_descriptor();

    assert_eq!(descriptor.context_path, "/app");
    assert_eq!(descriptor.context_file_name(), "app");
    assert_eq!(descriptor.artifact_name(), "app:war exploded");
    assert_eq!(descriptor.classpath.len(), 2);
    // The parser stats each entry to tell class directories from jars.
    assert!(descriptor.classpath[0].is_directory);
    assert!(!descriptor.classpath[1].is_directory);

    Ok(())
}

#[test]
fn test_validate_descriptor_requires_existing_doc_base() {
    let dir = tempfile::tempdir().unwrap();

    let good = DeploymentDescriptor::new("/app", dir.path());
    assert!(validator::validate_descriptor(&good).is_ok());

    let missing = DeploymentDescriptor::new("/app", dir.path().join("nope"));
    assert!(validator::validate_descriptor(&missing).is_err());
}

#[test]
fn test_validate_settings_checks_java_home() {
    let dir = tempfile::tempdir().unwrap();
    let bin = dir.path().join("bin");
    std::fs::create_dir_all(&bin).unwrap();
    let java = if cfg!(windows) { "java.exe" } else { "java" };
    std::fs::write(bin.join(java), b"").unwrap();

    let good = RunnerSettings {
        java_home: Some(dir.path().to_path_buf()),
        ..RunnerSettings::default()
    };
    assert!(validator::validate_settings(&good).is_ok());

    let bad = RunnerSettings {
        java_home: Some(dir.path().join("missing")),
        ..RunnerSettings::default()
    };
    assert!(validator::validate_settings(&bad).is_err());
}

#[test]
fn test_validate_config_rejects_empty() {
    let no_deployments = Config {
        server_home: PathBuf::from("/opt/tomcat"),
        settings: RunnerSettings::default(),
        deployments: HashMap::new(),
    };
    assert!(validator::validate_config(&no_deployments).is_err());

    let no_home = Config {
        server_home: PathBuf::new(),
        settings: RunnerSettings::default(),
        deployments: HashMap::new(),
    };
    assert!(validator::validate_config(&no_home).is_err());
}
