use crate::config::{Config, DeploymentDescriptor, PortAssignment, RunnerSettings};
use crate::error::{Error, Result};

/// Validates a deployment descriptor before launch
pub fn validate_descriptor(descriptor: &DeploymentDescriptor) -> Result<()> {
    if descriptor.doc_base.as_os_str().is_empty() {
        return Err(Error::ConfigInvalid(format!(
            "Deployment '{}' has an empty docBase",
            descriptor.context_path
        )));
    }
    if !descriptor.doc_base.is_dir() {
        return Err(Error::ConfigInvalid(format!(
            "docBase does not exist or is not a directory: {}",
            descriptor.doc_base.display()
        )));
    }
    Ok(())
}

/// Checks a port assignment for internal conflicts
pub fn validate_ports(ports: &PortAssignment) -> Result<()> {
    let mut assigned: Vec<(&str, u16)> = vec![("http", ports.http), ("shutdown", ports.shutdown)];
    if let Some(ssl) = ports.ssl {
        assigned.push(("ssl", ssl));
    }
    if let Some(ajp) = ports.ajp {
        assigned.push(("ajp", ajp));
    }

    for (i, (role, port)) in assigned.iter().enumerate() {
        for (other_role, other_port) in &assigned[i + 1..] {
            if port == other_port {
                return Err(Error::ConfigInvalid(format!(
                    "Port {} is assigned to both {} and {}",
                    port, role, other_role
                )));
            }
        }
    }
    Ok(())
}

/// Validates runner settings that point at the filesystem
pub fn validate_settings(settings: &RunnerSettings) -> Result<()> {
    if let Some(java_home) = &settings.java_home {
        let java = if cfg!(windows) {
            java_home.join("bin").join("java.exe")
        } else {
            java_home.join("bin").join("java")
        };
        if !java.is_file() {
            return Err(Error::ConfigInvalid(format!(
                "Configured Java home has no Java executable: {}",
                java.display()
            )));
        }
    }
    Ok(())
}

/// Full configuration validation
pub fn validate_config(config: &Config) -> Result<()> {
    if config.server_home.as_os_str().is_empty() {
        return Err(Error::ConfigInvalid("No server home configured".to_string()));
    }
    if config.deployments.is_empty() {
        return Err(Error::ConfigInvalid("No deployments configured".to_string()));
    }

    validate_settings(&config.settings)?;
    for deployment in config.deployments.values() {
        validate_ports(&deployment.ports)?;
    }

    Ok(())
}
