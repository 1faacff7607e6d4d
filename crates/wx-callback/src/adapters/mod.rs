//! Adapters: the XML wire codec and the axum HTTP front end.

pub mod http;
pub mod xml;

pub use http::router;
pub use xml::XmlCodec;
