//! Streaming rewrite of the server's `server.xml`.
//!
//! The transform patches ports and strips statically deployed contexts while
//! leaving every other byte of the document untouched, so a user-customized
//! `server.xml` (extra valves, comments, listeners) survives the rewrite.

use crate::conf::xml::{attr_value, set_attributes, write};
use crate::config::PortAssignment;
use crate::error::{Error, Result};
use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::Event;
use std::fs;
use std::path::Path;

const SERVER_XML_FILE: &str = "server.xml";

/// Which port assignment a connector element receives.
enum ConnectorRole {
    Http,
    Ssl,
    Ajp,
}

/// Applies a [`PortAssignment`] to a `server.xml` document.
///
/// The rewrite is a single streaming pass:
///
/// 1. The root element must be `Server`; its `port` attribute becomes the
///    shutdown port.
/// 2. The first `Connector` under `Server/Service` with `protocol="HTTP/1.1"`
///    that is not SSL-enabled receives the HTTP port. A document without one
///    is rejected.
/// 3. When an SSL port is assigned, the first `Connector` with
///    `SSLEnabled="true"` receives it; when an AJP port is assigned, the
///    first `Connector` with `protocol="AJP/1.3"` receives it. Either
///    connector being absent leaves that assignment unused.
/// 4. Every `Context` under `Server/Service/Engine/Host` is removed together
///    with its content. Deployment happens through per-context descriptors
///    instead.
///
/// Applying the same assignment twice yields an identical document.
///
/// # Errors
///
/// Returns `Error::ConfigTransform` when the document cannot be parsed, has
/// no `Server` root, or has no eligible HTTP connector.
pub fn transform_server_xml(content: &str, ports: &PortAssignment) -> Result<String> {
    let mut reader = Reader::from_str(content);
    let mut writer = Writer::new(Vec::new());
    let mut buf = Vec::new();

    let mut stack: Vec<String> = Vec::new();
    let mut root_seen = false;
    let mut http_done = false;
    let mut ssl_done = false;
    let mut ajp_done = false;
    // Number of open elements inside a Context subtree being dropped.
    let mut skip_depth: usize = 0;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                if skip_depth > 0 {
                    skip_depth += 1;
                } else {
                    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                    if stack.is_empty() {
                        if name != "Server" {
                            return Err(Error::ConfigTransform(format!(
                                "Root element is <{}>, expected <Server>",
                                name
                            )));
                        }
                        root_seen = true;
                        let shutdown = ports.shutdown.to_string();
                        let rebuilt = set_attributes(&e, &[("port", &shutdown)])?;
                        write(&mut writer, Event::Start(rebuilt))?;
                        stack.push(name);
                    } else if name == "Context" && at_host_level(&stack) {
                        skip_depth = 1;
                    } else if name == "Connector" && at_service_level(&stack) {
                        match classify_connector(&e, ports, http_done, ssl_done, ajp_done)? {
                            Some((role, port)) => {
                                mark_done(role, &mut http_done, &mut ssl_done, &mut ajp_done);
                                let port = port.to_string();
                                let rebuilt = set_attributes(&e, &[("port", &port)])?;
                                write(&mut writer, Event::Start(rebuilt))?;
                            }
                            None => write(&mut writer, Event::Start(e))?,
                        }
                        stack.push(name);
                    } else {
                        write(&mut writer, Event::Start(e))?;
                        stack.push(name);
                    }
                }
            }
            Ok(Event::Empty(e)) => {
                if skip_depth > 0 {
                    // A self-closing element does not change the skip depth.
                } else {
                    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                    if stack.is_empty() {
                        if name != "Server" {
                            return Err(Error::ConfigTransform(format!(
                                "Root element is <{}>, expected <Server>",
                                name
                            )));
                        }
                        root_seen = true;
                        let shutdown = ports.shutdown.to_string();
                        let rebuilt = set_attributes(&e, &[("port", &shutdown)])?;
                        write(&mut writer, Event::Empty(rebuilt))?;
                    } else if name == "Context" && at_host_level(&stack) {
                        // Dropped.
                    } else if name == "Connector" && at_service_level(&stack) {
                        match classify_connector(&e, ports, http_done, ssl_done, ajp_done)? {
                            Some((role, port)) => {
                                mark_done(role, &mut http_done, &mut ssl_done, &mut ajp_done);
                                let port = port.to_string();
                                let rebuilt = set_attributes(&e, &[("port", &port)])?;
                                write(&mut writer, Event::Empty(rebuilt))?;
                            }
                            None => write(&mut writer, Event::Empty(e))?,
                        }
                    } else {
                        write(&mut writer, Event::Empty(e))?;
                    }
                }
            }
            Ok(Event::End(e)) => {
                if skip_depth > 0 {
                    skip_depth -= 1;
                } else {
                    stack.pop();
                    write(&mut writer, Event::End(e))?;
                }
            }
            Ok(Event::Eof) => break,
            Ok(event) => {
                if skip_depth == 0 {
                    write(&mut writer, event)?;
                }
            }
            Err(e) => {
                return Err(Error::ConfigTransform(format!(
                    "Invalid server.xml at position {}: {}",
                    reader.buffer_position(),
                    e
                )));
            }
        }
        buf.clear();
    }

    if !root_seen {
        return Err(Error::ConfigTransform(
            "Document has no root <Server> element".to_string(),
        ));
    }
    if !http_done {
        return Err(Error::ConfigTransform(
            "No HTTP/1.1 connector found to receive the HTTP port".to_string(),
        ));
    }

    String::from_utf8(writer.into_inner())
        .map_err(|e| Error::ConfigTransform(format!("Transformed document is not UTF-8: {}", e)))
}

/// Rewrites `{conf_dir}/server.xml` in place with the given port assignment.
pub fn transform_server_xml_file(conf_dir: &Path, ports: &PortAssignment) -> Result<()> {
    let path = conf_dir.join(SERVER_XML_FILE);
    let content = fs::read_to_string(&path)
        .map_err(|e| Error::ConfigTransform(format!("Failed to read {}: {}", path.display(), e)))?;
    let transformed = transform_server_xml(&content, ports)?;
    fs::write(&path, transformed)
        .map_err(|e| Error::ConfigTransform(format!("Failed to write {}: {}", path.display(), e)))?;
    tracing::debug!(
        path = %path.display(),
        http = ports.http,
        shutdown = ports.shutdown,
        "Applied port assignment to server.xml"
    );
    Ok(())
}

fn at_service_level(stack: &[String]) -> bool {
    stack.len() == 2 && stack[0] == "Server" && stack[1] == "Service"
}

fn at_host_level(stack: &[String]) -> bool {
    stack.len() == 4
        && stack[0] == "Server"
        && stack[1] == "Service"
        && stack[2] == "Engine"
        && stack[3] == "Host"
}

fn classify_connector(
    elem: &quick_xml::events::BytesStart<'_>,
    ports: &PortAssignment,
    http_done: bool,
    ssl_done: bool,
    ajp_done: bool,
) -> Result<Option<(ConnectorRole, u16)>> {
    let protocol = attr_value(elem, "protocol")?;
    let ssl_enabled = attr_value(elem, "SSLEnabled")?;
    let is_ssl = ssl_enabled.as_deref() == Some("true");
    if !http_done && protocol.as_deref() == Some("HTTP/1.1") && !is_ssl {
        return Ok(Some((ConnectorRole::Http, ports.http)));
    }
    if let Some(port) = ports.ssl {
        if !ssl_done && is_ssl {
            return Ok(Some((ConnectorRole::Ssl, port)));
        }
    }
    if let Some(port) = ports.ajp {
        if !ajp_done && protocol.as_deref() == Some("AJP/1.3") {
            return Ok(Some((ConnectorRole::Ajp, port)));
        }
    }
    Ok(None)
}

fn mark_done(role: ConnectorRole, http: &mut bool, ssl: &mut bool, ajp: &mut bool) {
    match role {
        ConnectorRole::Http => *http = true,
        ConnectorRole::Ssl => *ssl = true,
        ConnectorRole::Ajp => *ajp = true,
    }
}
