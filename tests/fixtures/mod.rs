use std::io::Write;
use std::path::Path;
use zip::write::SimpleFileOptions;

/// Minimal but valid server.xml with one HTTP connector.
pub const SERVER_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Server port="8005" shutdown="SHUTDOWN">
  <Service name="Catalina">
    <Connector port="8080" protocol="HTTP/1.1"/>
    <Engine name="Catalina" defaultHost="localhost">
      <Host name="localhost" appBase="webapps"/>
    </Engine>
  </Service>
</Server>
"#;

/// Lays out a resolvable fake installation under `home`.
///
/// The bootstrap archives are empty placeholder files; only the core library
/// archive is a real zip, because the version descriptor is read out of it.
pub fn install_fake_server(home: &Path, version: &str) {
    let bin = home.join("bin");
    std::fs::create_dir_all(&bin).unwrap();
    std::fs::write(bin.join("bootstrap.jar"), b"").unwrap();
    std::fs::write(bin.join("tomcat-juli.jar"), b"").unwrap();

    let lib = home.join("lib");
    std::fs::create_dir_all(&lib).unwrap();
    let file = std::fs::File::create(lib.join("catalina.jar")).unwrap();
    let mut jar = zip::ZipWriter::new(file);
    jar.start_file(
        "org/apache/catalina/util/ServerInfo.properties",
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored),
    )
    .unwrap();
    let descriptor = format!(
        "server.info=Apache Tomcat/{}\nserver.number={}.0\n",
        version, version
    );
    jar.write_all(descriptor.as_bytes()).unwrap();
    jar.finish().unwrap();

    let conf = home.join("conf");
    std::fs::create_dir_all(&conf).unwrap();
    std::fs::write(conf.join("server.xml"), SERVER_XML).unwrap();
    std::fs::write(
        conf.join("logging.properties"),
        "handlers = java.util.logging.ConsoleHandler\n",
    )
    .unwrap();
}
