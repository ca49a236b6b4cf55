//! JSON-lines product writer.

use crate::Result;
use hcalrecon_core::{Event, Product};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

#[derive(Serialize)]
struct ProductRecord<'a> {
    event: u64,
    products: &'a BTreeMap<String, Product>,
}

/// Writes the products of each event as one JSON line:
/// `{"event": n, "products": {"HcalTracks": {"type": "Tracks", "data": [...]}}}`.
pub struct ProductFileWriter<W: Write = BufWriter<File>> {
    writer: W,
    events_written: usize,
}

impl ProductFileWriter {
    /// Creates a new file writer.
    ///
    /// # Errors
    /// Returns an error if the file cannot be created.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::create(path)?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> ProductFileWriter<W> {
    /// Wraps any writer.
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            events_written: 0,
        }
    }

    /// Writes one event's products.
    ///
    /// # Errors
    /// Returns an error if serialization or the write fails.
    pub fn write_event(&mut self, event: &Event) -> Result<()> {
        let record = ProductRecord {
            event: event.number(),
            products: event.products(),
        };
        serde_json::to_writer(&mut self.writer, &record)?;
        self.writer.write_all(b"\n")?;
        self.events_written += 1;
        Ok(())
    }

    /// Number of events written so far.
    pub fn events_written(&self) -> usize {
        self.events_written
    }

    /// Flushes the writer.
    ///
    /// # Errors
    /// Returns an error if the flush fails.
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    /// Flushes and returns the inner writer.
    ///
    /// # Errors
    /// Returns an error if the flush fails.
    pub fn into_inner(mut self) -> Result<W> {
        self.flush()?;
        Ok(self.writer)
    }
}
