mod fixtures;

use catalina_runner::conf::WorkingArea;
use catalina_runner::config::{RunnerSettings, ServerInstallation};
use catalina_runner::error::Error;
use catalina_runner::launch::{BOOTSTRAP_MAIN_CLASS, build_launch_spec};
use tempfile::TempDir;

fn setup() -> (TempDir, ServerInstallation, WorkingArea) {
    let dir = tempfile::tempdir().unwrap();
    let home = dir.path().join("tomcat");
    fixtures::install_fake_server(&home, "10.1.24");
    let installation = ServerInstallation::resolve(&home).unwrap();

    let base = dir.path().join("work");
    let area = WorkingArea::for_context("app", Some(&base)).unwrap();
    area.prepare(&installation.conf_dir()).unwrap();

    (dir, installation, area)
}

#[test]
fn test_classpath_starts_with_bootstrap_archives() {
    let (_guard, installation, area) = setup();

    let spec = build_launch_spec(&installation, &RunnerSettings::default(), &area).unwrap();

    assert_eq!(spec.classpath[0], installation.bin_dir().join("bootstrap.jar"));
    assert_eq!(
        spec.classpath[1],
        installation.bin_dir().join("tomcat-juli.jar")
    );
    assert_eq!(spec.main_class, BOOTSTRAP_MAIN_CLASS);
    assert_eq!(spec.program_args, vec!["start".to_string()]);
    assert_eq!(spec.working_dir.as_path(), area.root());
}

#[test]
fn test_mandatory_properties_follow_user_options() {
    let (_guard, installation, area) = setup();
    let settings = RunnerSettings {
        vm_options: "-Xmx512m -Dcatalina.base=/user/override".to_string(),
        ..RunnerSettings::default()
    };

    let spec = build_launch_spec(&installation, &settings, &area).unwrap();
    let opts = &spec.vm_options;

    let user_base = opts
        .iter()
        .position(|o| o == "-Dcatalina.base=/user/override")
        .unwrap();
    let runner_base = opts
        .iter()
        .position(|o| *o == format!("-Dcatalina.base={}", area.root().display()))
        .unwrap();
    // The runner's value comes later, so the server sees it win.
    assert!(user_base < runner_base);

    assert!(opts.contains(&format!(
        "-Dcatalina.home={}",
        installation.home().display()
    )));
    assert!(opts.contains(&format!("-Djava.io.tmpdir={}", area.temp().display())));
    assert_eq!(
        opts.last().map(String::as_str),
        Some("-Djava.util.logging.manager=org.apache.juli.ClassLoaderLogManager")
    );
}

#[test]
fn test_quoted_vm_option_kept_whole() {
    let (_guard, installation, area) = setup();
    let settings = RunnerSettings {
        vm_options: r#"-Dapp.title="My App" -Xms64m"#.to_string(),
        ..RunnerSettings::default()
    };

    let spec = build_launch_spec(&installation, &settings, &area).unwrap();

    assert!(spec.vm_options.contains(&"-Dapp.title=My App".to_string()));
    assert!(spec.vm_options.contains(&"-Xms64m".to_string()));
}

#[test]
fn test_extra_classpath_appended_in_order() {
    let (_guard, installation, area) = setup();
    let sep = if cfg!(windows) { ";" } else { ":" };
    let settings = RunnerSettings {
        extra_classpath: format!("/opt/agent.jar{}/opt/ext", sep),
        ..RunnerSettings::default()
    };

    let spec = build_launch_spec(&installation, &settings, &area).unwrap();

    assert_eq!(spec.classpath.len(), 4);
    assert_eq!(spec.classpath[2], std::path::PathBuf::from("/opt/agent.jar"));
    assert_eq!(spec.classpath[3], std::path::PathBuf::from("/opt/ext"));

    let joined = spec.classpath_string();
    assert!(joined.contains(&format!("bootstrap.jar{}", sep)));
    assert!(joined.ends_with("/opt/ext"));
}

#[test]
fn test_missing_bootstrap_archive_rejected() {
    let (_guard, installation, area) = setup();
    std::fs::remove_file(installation.bin_dir().join("bootstrap.jar")).unwrap();

    let result = build_launch_spec(&installation, &RunnerSettings::default(), &area);
    assert!(matches!(result, Err(Error::InstallationInvalid(_))));
}

#[test]
fn test_jdk_java_options_extended_not_replaced() {
    let (_guard, installation, area) = setup();
    let settings = RunnerSettings {
        env: [("JDK_JAVA_OPTIONS".to_string(), "-Xshare:off".to_string())]
            .into_iter()
            .collect(),
        ..RunnerSettings::default()
    };

    let spec = build_launch_spec(&installation, &settings, &area).unwrap();

    let value = &spec.env["JDK_JAVA_OPTIONS"];
    assert!(value.starts_with("-Xshare:off "));
    assert!(value.contains("--add-opens=java.base/java.lang=ALL-UNNAMED"));
    assert!(value.contains("--add-opens=java.rmi/sun.rmi.transport=ALL-UNNAMED"));
}

#[test]
fn test_jdk_java_options_set_when_absent() {
    let (_guard, installation, area) = setup();
    // Cut off the ambient environment so the result is deterministic.
    let settings = RunnerSettings {
        pass_parent_env: false,
        ..RunnerSettings::default()
    };

    let spec = build_launch_spec(&installation, &settings, &area).unwrap();

    let value = &spec.env["JDK_JAVA_OPTIONS"];
    assert!(value.starts_with("--add-opens=java.base/java.lang=ALL-UNNAMED"));
    assert!(value.contains("--add-opens=java.base/java.util.concurrent=ALL-UNNAMED"));
    assert!(!spec.pass_parent_env);
}

#[test]
fn test_java_resolved_from_configured_home() {
    let (_guard, installation, area) = setup();

    let jdk = tempfile::tempdir().unwrap();
    let bin = jdk.path().join("bin");
    std::fs::create_dir_all(&bin).unwrap();
    let java_name = if cfg!(windows) { "java.exe" } else { "java" };
    std::fs::write(bin.join(java_name), b"").unwrap();

    let settings = RunnerSettings {
        java_home: Some(jdk.path().to_path_buf()),
        ..RunnerSettings::default()
    };
    let spec = build_launch_spec(&installation, &settings, &area).unwrap();
    assert_eq!(spec.java, bin.join(java_name));

    let broken = RunnerSettings {
        java_home: Some(jdk.path().join("missing")),
        ..RunnerSettings::default()
    };
    let result = build_launch_spec(&installation, &broken, &area);
    assert!(matches!(result, Err(Error::ConfigInvalid(_))));
}
