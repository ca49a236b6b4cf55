//! JSON-lines event reader.
//!
//! One event per line:
//! `{"event": 1, "collections": [{"name": "hcalDigis", "pass": "recon", "hits": [...]}]}`.
//! Blank lines are skipped.

use crate::{Error, Result};
use hcalrecon_core::{Event, HcalHit, InputTag};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::{Path, PathBuf};

/// One hit collection as stored on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionRecord {
    /// Collection name.
    pub name: String,
    /// Pass name.
    #[serde(default = "default_pass")]
    pub pass: String,
    /// Hits of the collection.
    #[serde(default)]
    pub hits: Vec<HcalHit>,
}

fn default_pass() -> String {
    InputTag::default().pass
}

/// One event as stored on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Event number.
    pub event: u64,
    /// Hit collections.
    #[serde(default)]
    pub collections: Vec<CollectionRecord>,
}

impl EventRecord {
    /// Copies the hit collections of an event.
    pub fn from_event(event: &Event) -> Self {
        Self {
            event: event.number(),
            collections: event
                .collections()
                .map(|(tag, hits)| CollectionRecord {
                    name: tag.collection.clone(),
                    pass: tag.pass.clone(),
                    hits: hits.to_vec(),
                })
                .collect(),
        }
    }

    /// Converts the record into an event.
    ///
    /// # Errors
    /// Returns an error if two collections share a name and pass.
    pub fn into_event(self) -> Result<Event> {
        let mut event = Event::new(self.event);
        for collection in self.collections {
            let tag = InputTag::new(collection.name, collection.pass);
            if event.collection(&tag).is_ok() {
                return Err(Error::InvalidFormat(format!(
                    "event {} has collection '{tag}' twice",
                    self.event
                )));
            }
            event.insert_collection(tag, collection.hits);
        }
        Ok(event)
    }
}

/// Streaming reader over a JSON-lines event file.
pub struct EventFileReader {
    lines: Lines<BufReader<File>>,
    path: PathBuf,
    line: usize,
}

impl EventFileReader {
    /// Opens an event file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(&path)?;
        Ok(Self {
            lines: BufReader::new(file).lines(),
            path: path.as_ref().to_path_buf(),
            line: 0,
        })
    }

    /// Path of the file being read.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads every remaining event.
    ///
    /// # Errors
    /// Returns the first read or parse error.
    pub fn read_all(self) -> Result<Vec<Event>> {
        self.collect()
    }
}

impl Iterator for EventFileReader {
    type Item = Result<Event>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(err) => return Some(Err(err.into())),
            };
            self.line += 1;
            if line.trim().is_empty() {
                continue;
            }
            let record = serde_json::from_str::<EventRecord>(&line).map_err(|source| Error::Json {
                line: self.line,
                source,
            });
            return Some(record.and_then(EventRecord::into_event));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hcalrecon_core::Section;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_lines(lines: &[&str]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        for line in lines {
            writeln!(file, "{line}").unwrap();
        }
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_read_events() {
        let file = write_lines(&[
            r#"{"event": 1, "collections": [{"name": "hcalDigis", "pass": "recon", "hits": [{"section": "Back", "layer": 3, "strip": 12, "pe": 9.5, "energy": 1.25}]}]}"#,
            "",
            r#"{"event": 2, "collections": [{"name": "hcalDigis", "hits": []}]}"#,
            r#"{"event": 3}"#,
        ]);
        let events = EventFileReader::open(file.path()).unwrap().read_all().unwrap();
        assert_eq!(events.len(), 3);

        let hits = events[0].collection(&InputTag::default()).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].section, Section::Back);
        assert_eq!(hits[0].strip, 12);

        assert!(events[1].collection(&InputTag::default()).unwrap().is_empty());
        assert!(events[2].collection(&InputTag::default()).is_err());
    }

    #[test]
    fn test_bad_line_reports_line_number() {
        let file = write_lines(&[r#"{"event": 1}"#, "", r#"{"event": "two"}"#]);
        let mut reader = EventFileReader::open(file.path()).unwrap();
        assert!(reader.next().unwrap().is_ok());
        assert!(matches!(reader.next(), Some(Err(Error::Json { line: 3, .. }))));
        assert!(reader.next().is_none());
    }

    #[test]
    fn test_duplicate_collection() {
        let file = write_lines(&[
            r#"{"event": 5, "collections": [{"name": "hcalDigis"}, {"name": "hcalDigis", "pass": "recon"}]}"#,
        ]);
        let result = EventFileReader::open(file.path()).unwrap().read_all();
        assert!(matches!(result, Err(Error::InvalidFormat(_))));
    }

    #[test]
    fn test_record_from_event() {
        let mut event = Event::new(8);
        event.insert_collection(
            InputTag::new("hcalDigis", "sim"),
            vec![HcalHit::new(Section::Left, 2, 4, 7.0, 0.5)],
        );
        let record = EventRecord::from_event(&event);
        assert_eq!(record.collections[0].pass, "sim");
        let back = record.into_event().unwrap();
        assert_eq!(
            back.collection(&InputTag::new("hcalDigis", "sim")).unwrap().len(),
            1
        );
    }
}
