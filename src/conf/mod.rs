//! Working-area preparation and server configuration synthesis.
//!
//! Each launch gets a private working area seeded from the installation's
//! `conf/` template. The modules here fill that area in: a context descriptor
//! synthesized for the deployment and a `server.xml` rewritten with the
//! launch's port assignment.

mod context;
mod server_xml;
mod work_area;
mod xml;

pub use context::{synthesize_context, write_context_file};
pub use server_xml::{transform_server_xml, transform_server_xml_file};
pub use work_area::WorkingArea;
