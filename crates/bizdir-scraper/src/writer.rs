use std::io;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::fields::FieldSet;
use crate::record::BusinessRecord;

pub const DEFAULT_CSV_FILE: &str = "addisbiz_businesses.csv";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CsvWriterConfig {
    #[serde(default = "default_csv_delimiter")]
    pub delimiter: char,
    #[serde(default)]
    pub escape: Option<char>,
    #[serde(default = "default_csv_terminator")]
    pub terminator: CsvTerminator,
    #[serde(default = "default_csv_headers")]
    pub headers: bool,
}

impl Default for CsvWriterConfig {
    fn default() -> Self {
        Self {
            delimiter: ',',
            escape: None,
            terminator: CsvTerminator::Any('\n'),
            headers: true,
        }
    }
}

fn default_csv_delimiter() -> char {
    CsvWriterConfig::default().delimiter
}

fn default_csv_terminator() -> CsvTerminator {
    CsvWriterConfig::default().terminator
}

fn default_csv_headers() -> bool {
    CsvWriterConfig::default().headers
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum CsvTerminator {
    CRLF,
    Any(char),
}

impl TryFrom<CsvTerminator> for csv::Terminator {
    type Error = anyhow::Error;

    fn try_from(source: CsvTerminator) -> Result<Self, Self::Error> {
        match source {
            CsvTerminator::CRLF => Ok(Self::CRLF),
            CsvTerminator::Any(c) => ascii(c, "terminator").map(Self::Any),
        }
    }
}

impl TryFrom<&CsvWriterConfig> for csv::WriterBuilder {
    type Error = anyhow::Error;

    fn try_from(c: &CsvWriterConfig) -> Result<Self, Self::Error> {
        let mut builder = csv::WriterBuilder::new();
        builder.has_headers(false);
        builder.delimiter(ascii(c.delimiter, "delimiter")?);
        builder.terminator(c.terminator.try_into()?);
        if let Some(escape) = c.escape {
            builder.double_quote(false);
            builder.escape(ascii(escape, "escape")?);
        } else {
            builder.double_quote(true);
        }
        Ok(builder)
    }
}

/// CSV control characters must be single bytes.
fn ascii(c: char, what: &str) -> anyhow::Result<u8> {
    if c.is_ascii() {
        Ok(c as u8)
    } else {
        anyhow::bail!("CSV {what} must be an ASCII character, got {c:?}")
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum FileMode {
    /// Fail if the file already exists
    #[default]
    Create,
    /// Overwrite any existing content
    Truncate,
    /// Add rows after existing content
    Append,
}

impl From<FileMode> for fs_err::OpenOptions {
    fn from(mode: FileMode) -> Self {
        let mut opts = fs_err::OpenOptions::new();
        match mode {
            FileMode::Create => opts.write(true).create_new(true),
            FileMode::Truncate => opts.write(true).create(true).truncate(true),
            FileMode::Append => opts.append(true).create(true),
        };
        opts
    }
}

/// Writes business records as CSV rows restricted to the selected fields.
pub struct RecordWriter<W: io::Write> {
    wtr: csv::Writer<W>,
    fields: FieldSet,
    pending_headers: bool,
}

impl<W: io::Write> RecordWriter<W> {
    pub fn from_writer(
        writer: W,
        config: &CsvWriterConfig,
        fields: FieldSet,
    ) -> anyhow::Result<Self> {
        let builder = csv::WriterBuilder::try_from(config)?;
        Ok(Self {
            wtr: builder.from_writer(writer),
            fields,
            pending_headers: config.headers,
        })
    }

    pub fn write(&mut self, record: &BusinessRecord) -> anyhow::Result<()> {
        if self.pending_headers {
            self.wtr.write_record(self.fields.headers())?;
            self.pending_headers = false;
        }
        self.wtr.write_record(record.row(&self.fields))?;
        Ok(())
    }

    pub fn write_all<'a, I>(&mut self, records: I) -> anyhow::Result<usize>
    where
        I: IntoIterator<Item = &'a BusinessRecord>,
    {
        let mut n = 0;
        for record in records {
            self.write(record)?;
            n += 1;
        }
        Ok(n)
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.wtr.flush()
    }

    pub fn into_inner(self) -> anyhow::Result<W> {
        self.wtr
            .into_inner()
            .map_err(|e| anyhow::anyhow!("Couldn't flush CSV writer: {}", e.error()))
    }
}

impl RecordWriter<fs_err::File> {
    /// Opens `path` with the given mode, appending to a non-empty file skips the header row.
    pub fn create<P: AsRef<Path>>(
        path: P,
        mode: FileMode,
        config: &CsvWriterConfig,
        fields: FieldSet,
    ) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let builder = csv::WriterBuilder::try_from(config)?;
        let opts: fs_err::OpenOptions = mode.into();
        let file = opts.open(path)?;
        let non_empty = file
            .metadata()
            .with_context(|| format!("Couldn't stat {}", path.display()))?
            .len()
            > 0;

        Ok(Self {
            wtr: builder.from_writer(file),
            fields,
            pending_headers: config.headers && !(mode == FileMode::Append && non_empty),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::Field;
    use serde_json::json;

    fn records(fields: &FieldSet) -> Vec<BusinessRecord> {
        vec![
            BusinessRecord::project(
                &json!({"name": "Abebe, Sons & Co", "telephone": "0115"}),
                fields,
                "https://a.example/1",
            ),
            BusinessRecord::project(&json!({"name": "Tsion"}), fields, "https://a.example/2"),
        ]
    }

    #[test]
    fn csv_with_headers_and_empty_cells() {
        let fields: FieldSet = "name,telephone,source_url".parse().unwrap();
        let mut wtr =
            RecordWriter::from_writer(vec![], &CsvWriterConfig::default(), fields.clone()).unwrap();
        assert_eq!(wtr.write_all(&records(&fields)).unwrap(), 2);
        let out = String::from_utf8(wtr.into_inner().unwrap()).unwrap();
        assert_eq!(
            out,
            "name,telephone,source_url\n\
             \"Abebe, Sons & Co\",0115,https://a.example/1\n\
             Tsion,,https://a.example/2\n"
        );
    }

    #[test]
    fn tsv_without_headers() {
        let fields: FieldSet = [Field::Name, Field::SourceUrl].into_iter().collect();
        let config = CsvWriterConfig {
            delimiter: '\t',
            headers: false,
            ..Default::default()
        };
        let mut wtr = RecordWriter::from_writer(vec![], &config, fields.clone()).unwrap();
        wtr.write_all(&records(&fields)).unwrap();
        let out = String::from_utf8(wtr.into_inner().unwrap()).unwrap();
        assert_eq!(
            out,
            "Abebe, Sons & Co\thttps://a.example/1\nTsion\thttps://a.example/2\n"
        );
    }

    #[test]
    fn non_ascii_control_chars_are_rejected() {
        let fields = FieldSet::default();
        for config in [
            CsvWriterConfig {
                delimiter: '§',
                ..Default::default()
            },
            CsvWriterConfig {
                escape: Some('é'),
                ..Default::default()
            },
            CsvWriterConfig {
                terminator: CsvTerminator::Any('¶'),
                ..Default::default()
            },
        ] {
            assert!(RecordWriter::from_writer(vec![], &config, fields.clone()).is_err());
        }

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let config = CsvWriterConfig {
            delimiter: '§',
            ..Default::default()
        };
        assert!(RecordWriter::create(&path, FileMode::Create, &config, fields).is_err());
        assert!(!path.exists());
    }

    #[test]
    fn file_modes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let fields: FieldSet = "name".parse().unwrap();
        let config = CsvWriterConfig::default();

        let mut wtr =
            RecordWriter::create(&path, FileMode::Create, &config, fields.clone()).unwrap();
        wtr.write_all(&records(&fields)).unwrap();
        wtr.flush().unwrap();
        drop(wtr);

        assert!(RecordWriter::create(&path, FileMode::Create, &config, fields.clone()).is_err());

        let mut wtr =
            RecordWriter::create(&path, FileMode::Append, &config, fields.clone()).unwrap();
        wtr.write_all(&records(&fields)[1..]).unwrap();
        wtr.flush().unwrap();
        drop(wtr);
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "name\n\"Abebe, Sons & Co\"\nTsion\nTsion\n"
        );

        let mut wtr =
            RecordWriter::create(&path, FileMode::Truncate, &config, fields.clone()).unwrap();
        wtr.write_all(&records(&fields)[1..]).unwrap();
        wtr.flush().unwrap();
        drop(wtr);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "name\nTsion\n");
    }
}
