//! Synthesis of the per-context deployment descriptor.
//!
//! A deployment is described to the server by a small XML file placed under
//! `conf/Catalina/localhost/`. The application may ship its own template in
//! `META-INF/`; when it does, the template content is preserved and only the
//! attributes and children this runner owns are merged in.

use crate::conf::xml::{set_attributes, write};
use crate::config::{DeploymentDescriptor, VersionTier};
use crate::error::{Error, Result};
use crate::resources::{ResourceKind, ResourceMapping};
use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use std::fs;
use std::path::{Path, PathBuf};

/// Template file names probed under `{doc_base}/META-INF`, first match wins.
const TEMPLATE_CANDIDATES: [&str; 2] = ["context_local.xml", "context.xml"];
const META_INF_DIR: &str = "META-INF";
const CATALINA_CONF_SUBDIR: &str = "Catalina";
const LOCALHOST_CONF_SUBDIR: &str = "localhost";

const DIR_RESOURCE_CLASS: &str = "org.apache.catalina.webresources.DirResourceSet";
const FILE_RESOURCE_CLASS: &str = "org.apache.catalina.webresources.FileResourceSet";
const VIRTUAL_LOADER_CLASS: &str = "org.apache.catalina.loader.VirtualWebappLoader";

/// Produces the context descriptor document for one deployment.
///
/// The application's own template (`META-INF/context_local.xml`, then
/// `META-INF/context.xml`) is used when present; otherwise the document is
/// built from scratch. In both cases the root element's `docBase` and `path`
/// attributes are set to the descriptor's values, overwriting whatever the
/// template declared, and the classpath mappings are attached in the form the
/// server generation understands:
///
/// * [`VersionTier::LayeredResources`]: a single `Resources` child (reused if
///   the template already has one) holding `PreResources` entries for class
///   directories and `PostResources` entries for jars.
/// * [`VersionTier::ClassicLoader`]: a `Loader` child pointing the virtual
///   webapp loader at the `;`-joined entry paths.
///
/// No mappings means no `Resources` or `Loader` element is added.
///
/// # Errors
///
/// Returns `Error::ConfigTransform` when a template exists but cannot be read
/// or parsed.
pub fn synthesize_context(
    descriptor: &DeploymentDescriptor,
    resources: &[ResourceMapping],
    tier: VersionTier,
) -> Result<String> {
    let doc_base = descriptor.doc_base.to_string_lossy().into_owned();
    match load_template(&descriptor.doc_base)? {
        Some((path, template)) => {
            tracing::debug!(template = %path.display(), "Merging application context template");
            merge_template(&template, &doc_base, &descriptor.context_path, resources, tier)
        }
        None => build_fresh(&doc_base, &descriptor.context_path, resources, tier),
    }
}

/// Writes a synthesized context document into the working `conf` tree.
///
/// The `conf/Catalina` subtree is removed first so no descriptor from a
/// previous launch survives, then the document lands at
/// `conf/Catalina/localhost/{context file name}.xml`.
pub fn write_context_file(
    conf_dir: &Path,
    descriptor: &DeploymentDescriptor,
    document: &str,
) -> Result<PathBuf> {
    let catalina_dir = conf_dir.join(CATALINA_CONF_SUBDIR);
    if catalina_dir.exists() {
        fs::remove_dir_all(&catalina_dir).map_err(|e| {
            Error::WorkArea(format!(
                "Failed to remove stale {}: {}",
                catalina_dir.display(),
                e
            ))
        })?;
    }
    let localhost_dir = catalina_dir.join(LOCALHOST_CONF_SUBDIR);
    fs::create_dir_all(&localhost_dir).map_err(|e| {
        Error::WorkArea(format!(
            "Failed to create {}: {}",
            localhost_dir.display(),
            e
        ))
    })?;
    let path = localhost_dir.join(format!("{}.xml", descriptor.context_file_name()));
    fs::write(&path, document)
        .map_err(|e| Error::WorkArea(format!("Failed to write {}: {}", path.display(), e)))?;
    tracing::debug!(path = %path.display(), "Wrote context descriptor");
    Ok(path)
}

fn load_template(doc_base: &Path) -> Result<Option<(PathBuf, String)>> {
    for candidate in TEMPLATE_CANDIDATES {
        let path = doc_base.join(META_INF_DIR).join(candidate);
        if path.is_file() {
            let content = fs::read_to_string(&path).map_err(|e| {
                Error::ConfigTransform(format!("Failed to read {}: {}", path.display(), e))
            })?;
            return Ok(Some((path, content)));
        }
    }
    Ok(None)
}

fn build_fresh(
    doc_base: &str,
    context_path: &str,
    resources: &[ResourceMapping],
    tier: VersionTier,
) -> Result<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    write(
        &mut writer,
        Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)),
    )?;
    let mut root = BytesStart::new("Context");
    root.push_attribute(("docBase", doc_base));
    root.push_attribute(("path", context_path));
    if resources.is_empty() {
        write(&mut writer, Event::Empty(root))?;
    } else {
        write(&mut writer, Event::Start(root))?;
        match tier {
            VersionTier::LayeredResources => {
                write(&mut writer, Event::Start(BytesStart::new("Resources")))?;
                for mapping in resources {
                    write(&mut writer, Event::Empty(resource_element(mapping)))?;
                }
                write(&mut writer, Event::End(BytesEnd::new("Resources")))?;
            }
            VersionTier::ClassicLoader => {
                write(&mut writer, Event::Empty(loader_element(resources)))?;
            }
        }
        write(&mut writer, Event::End(BytesEnd::new("Context")))?;
    }
    document_string(writer)
}

/// Merges the runner-owned attributes and children into a user template.
///
/// Template events pass through untouched apart from the root element's
/// `docBase` and `path` attributes. Classpath children are appended inside an
/// existing `Resources` element when the tier uses one, otherwise injected as
/// the last children of the root.
fn merge_template(
    template: &str,
    doc_base: &str,
    context_path: &str,
    resources: &[ResourceMapping],
    tier: VersionTier,
) -> Result<String> {
    let mut reader = Reader::from_str(template);
    let mut writer = Writer::new(Vec::new());
    let mut buf = Vec::new();

    let mut depth: usize = 0;
    let mut root_patched = false;
    let mut resources_handled = false;
    // Some(n) while inside the root-level Resources element, n open elements deep.
    let mut resources_nesting: Option<usize> = None;
    let layered = tier == VersionTier::LayeredResources;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                if let Some(nesting) = resources_nesting {
                    resources_nesting = Some(nesting + 1);
                    write(&mut writer, Event::Start(e))?;
                } else if depth == 0 && !root_patched {
                    root_patched = true;
                    let rebuilt =
                        set_attributes(&e, &[("docBase", doc_base), ("path", context_path)])?;
                    write(&mut writer, Event::Start(rebuilt))?;
                } else if depth == 1
                    && layered
                    && !resources_handled
                    && !resources.is_empty()
                    && e.name().as_ref() == b"Resources"
                {
                    resources_nesting = Some(1);
                    write(&mut writer, Event::Start(e))?;
                } else {
                    write(&mut writer, Event::Start(e))?;
                }
                depth += 1;
            }
            Ok(Event::Empty(e)) => {
                if depth == 0 && !root_patched {
                    root_patched = true;
                    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                    let rebuilt =
                        set_attributes(&e, &[("docBase", doc_base), ("path", context_path)])?;
                    if resources.is_empty() {
                        write(&mut writer, Event::Empty(rebuilt))?;
                    } else {
                        write(&mut writer, Event::Start(rebuilt))?;
                        inject_children(&mut writer, resources, tier)?;
                        write(&mut writer, Event::End(BytesEnd::new(name)))?;
                    }
                } else if depth == 1
                    && layered
                    && resources_nesting.is_none()
                    && !resources_handled
                    && !resources.is_empty()
                    && e.name().as_ref() == b"Resources"
                {
                    resources_handled = true;
                    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                    write(&mut writer, Event::Start(e))?;
                    append_resource_children(&mut writer, resources)?;
                    write(&mut writer, Event::End(BytesEnd::new(name)))?;
                } else {
                    write(&mut writer, Event::Empty(e))?;
                }
            }
            Ok(Event::End(e)) => {
                match resources_nesting {
                    Some(1) => {
                        resources_nesting = None;
                        resources_handled = true;
                        append_resource_children(&mut writer, resources)?;
                        write(&mut writer, Event::End(e))?;
                    }
                    Some(nesting) => {
                        resources_nesting = Some(nesting - 1);
                        write(&mut writer, Event::End(e))?;
                    }
                    None => {
                        if depth == 1 && !resources.is_empty() {
                            if layered && !resources_handled {
                                resources_handled = true;
                                inject_children(&mut writer, resources, tier)?;
                            } else if !layered {
                                inject_children(&mut writer, resources, tier)?;
                            }
                        }
                        write(&mut writer, Event::End(e))?;
                    }
                }
                depth = depth.saturating_sub(1);
            }
            Ok(Event::Eof) => break,
            Ok(event) => write(&mut writer, event)?,
            Err(e) => {
                return Err(Error::ConfigTransform(format!(
                    "Invalid context template at position {}: {}",
                    reader.buffer_position(),
                    e
                )));
            }
        }
        buf.clear();
    }

    if !root_patched {
        return Err(Error::ConfigTransform(
            "Context template has no root element".to_string(),
        ));
    }
    document_string(writer)
}

fn inject_children(
    writer: &mut Writer<Vec<u8>>,
    resources: &[ResourceMapping],
    tier: VersionTier,
) -> Result<()> {
    match tier {
        VersionTier::LayeredResources => {
            write(writer, Event::Text(BytesText::new("\n  ")))?;
            write(writer, Event::Start(BytesStart::new("Resources")))?;
            append_resource_children(writer, resources)?;
            write(writer, Event::End(BytesEnd::new("Resources")))?;
            write(writer, Event::Text(BytesText::new("\n")))?;
        }
        VersionTier::ClassicLoader => {
            write(writer, Event::Text(BytesText::new("\n  ")))?;
            write(writer, Event::Empty(loader_element(resources)))?;
            write(writer, Event::Text(BytesText::new("\n")))?;
        }
    }
    Ok(())
}

fn append_resource_children(
    writer: &mut Writer<Vec<u8>>,
    resources: &[ResourceMapping],
) -> Result<()> {
    for mapping in resources {
        write(writer, Event::Text(BytesText::new("\n    ")))?;
        write(writer, Event::Empty(resource_element(mapping)))?;
    }
    write(writer, Event::Text(BytesText::new("\n  ")))?;
    Ok(())
}

fn resource_element(mapping: &ResourceMapping) -> BytesStart<'static> {
    let (tag, class) = match mapping.kind {
        ResourceKind::Directory => ("PreResources", DIR_RESOURCE_CLASS),
        ResourceKind::File => ("PostResources", FILE_RESOURCE_CLASS),
    };
    let mut elem = BytesStart::new(tag);
    elem.push_attribute(("className", class));
    elem.push_attribute(("base", mapping.base.to_string_lossy().as_ref()));
    elem.push_attribute(("webAppMount", mapping.mount.as_str()));
    elem
}

fn loader_element(resources: &[ResourceMapping]) -> BytesStart<'static> {
    let joined = resources
        .iter()
        .map(|m| m.base.to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(";");
    let mut elem = BytesStart::new("Loader");
    elem.push_attribute(("className", VIRTUAL_LOADER_CLASS));
    elem.push_attribute(("virtualClasspath", joined.as_str()));
    elem
}

fn document_string(writer: Writer<Vec<u8>>) -> Result<String> {
    String::from_utf8(writer.into_inner())
        .map_err(|e| Error::ConfigTransform(format!("Synthesized context is not UTF-8: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DeploymentDescriptor;

    fn dir_mapping(base: &str) -> ResourceMapping {
        ResourceMapping {
            base: base.into(),
            mount: "/WEB-INF/classes".to_string(),
            kind: ResourceKind::Directory,
        }
    }

    fn jar_mapping(base: &str, name: &str) -> ResourceMapping {
        ResourceMapping {
            base: base.into(),
            mount: format!("/WEB-INF/lib/{}", name),
            kind: ResourceKind::File,
        }
    }

    #[test]
    fn test_fresh_context_without_resources_is_self_closing() {
        let descriptor = DeploymentDescriptor::new("/app", "/srv/webapp");
        let doc =
            synthesize_context(&descriptor, &[], VersionTier::LayeredResources).unwrap();
        assert!(doc.contains(r#"<Context docBase="/srv/webapp" path="/app"/>"#));
        assert!(!doc.contains("<Resources"));
    }

    #[test]
    fn test_fresh_layered_context_lists_mappings() {
        let descriptor = DeploymentDescriptor::new("/app", "/srv/webapp");
        let mappings = vec![
            dir_mapping("/build/classes"),
            jar_mapping("/libs/util.jar", "util.jar"),
        ];
        let doc =
            synthesize_context(&descriptor, &mappings, VersionTier::LayeredResources).unwrap();
        assert!(doc.contains("<Resources>"));
        assert!(doc.contains(
            r#"<PreResources className="org.apache.catalina.webresources.DirResourceSet" base="/build/classes" webAppMount="/WEB-INF/classes"/>"#
        ));
        assert!(doc.contains(
            r#"<PostResources className="org.apache.catalina.webresources.FileResourceSet" base="/libs/util.jar" webAppMount="/WEB-INF/lib/util.jar"/>"#
        ));
    }

    #[test]
    fn test_fresh_classic_context_joins_loader_classpath() {
        let descriptor = DeploymentDescriptor::new("/app", "/srv/webapp");
        let mappings = vec![
            dir_mapping("/build/classes"),
            jar_mapping("/libs/util.jar", "util.jar"),
        ];
        let doc =
            synthesize_context(&descriptor, &mappings, VersionTier::ClassicLoader).unwrap();
        assert!(doc.contains(
            r#"<Loader className="org.apache.catalina.loader.VirtualWebappLoader" virtualClasspath="/build/classes;/libs/util.jar"/>"#
        ));
        assert!(!doc.contains("<Resources"));
    }
}
