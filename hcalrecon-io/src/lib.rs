//! hcalrecon-io: JSON-lines file I/O for hcalrecon.
//!
//! Events are read one per line with their hit collections; the products
//! added by a [`hcalrecon_algorithms::Process`] are written back one event
//! per line. Process configurations are plain JSON.
//!

mod config;
mod error;
mod reader;
mod writer;

pub use config::ProcessConfig;
pub use error::{Error, Result};
pub use reader::{CollectionRecord, EventFileReader, EventRecord};
pub use writer::ProductFileWriter;
