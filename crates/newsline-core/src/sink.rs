//! JSON-lines status record sink with tmp→rename segments

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::rotation::RotationPolicy;
use crate::status::StatusRecord;

/// One open segment file
struct Segment {
    writer: BufWriter<File>,
    tmp_path: PathBuf,
    final_path: PathBuf,
    offset: u64,
    records: usize,
}

impl Segment {
    fn create(output_dir: &Path, prefix: &str, idx: usize) -> io::Result<Self> {
        let filename = format!("{prefix}-{idx:05}.jsonl");
        let final_path = output_dir.join(&filename);
        let tmp_path = output_dir.join(format!("{filename}.tmp"));

        if tmp_path.exists() {
            fs::remove_file(&tmp_path)?;
        }

        Ok(Self {
            writer: BufWriter::new(File::create(&tmp_path)?),
            tmp_path,
            final_path,
            offset: 0,
            records: 0,
        })
    }

    fn finalize(mut self) -> io::Result<PathBuf> {
        self.writer.flush()?;
        fs::rename(&self.tmp_path, &self.final_path)?;
        log::debug!(
            "Finalized {} ({} records, {} bytes)",
            self.final_path.display(),
            self.records,
            self.offset
        );
        Ok(self.final_path)
    }
}

/// Writes status records into rotating `<prefix>-<NNNNN>.jsonl` segments.
///
/// Segments are written under a `.tmp` name and only appear under their final
/// name once complete. A segment is opened lazily on the first record, so no
/// empty segment is left behind after a rotation.
pub struct SegmentSink {
    output_dir: PathBuf,
    prefix: String,
    policy: RotationPolicy,
    current: Option<Segment>,
    next_idx: usize,
    finished: Vec<PathBuf>,
    total_records: usize,
}

impl std::fmt::Debug for SegmentSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SegmentSink")
            .field("output_dir", &self.output_dir)
            .field("prefix", &self.prefix)
            .field("next_idx", &self.next_idx)
            .field("total_records", &self.total_records)
            .finish_non_exhaustive()
    }
}

impl SegmentSink {
    pub fn new(output_dir: &Path, prefix: &str, policy: RotationPolicy) -> io::Result<Self> {
        fs::create_dir_all(output_dir)?;
        Ok(Self {
            output_dir: output_dir.to_path_buf(),
            prefix: prefix.to_string(),
            policy,
            current: None,
            next_idx: 0,
            finished: Vec::new(),
            total_records: 0,
        })
    }

    pub fn write(&mut self, record: &StatusRecord) -> io::Result<()> {
        let mut line = serde_json::to_vec(record).map_err(io::Error::other)?;
        line.push(b'\n');

        let segment = match self.current.as_mut() {
            Some(segment) => segment,
            None => {
                let segment = Segment::create(&self.output_dir, &self.prefix, self.next_idx)?;
                self.next_idx += 1;
                self.policy.reset();
                self.current.insert(segment)
            }
        };
        segment.writer.write_all(&line)?;
        segment.offset += line.len() as u64;
        segment.records += 1;
        self.total_records += 1;

        if self.policy.mark(segment.offset) {
            self.rotate()?;
        }
        Ok(())
    }

    pub fn write_all<'a>(
        &mut self,
        records: impl IntoIterator<Item = &'a StatusRecord>,
    ) -> io::Result<()> {
        for record in records {
            self.write(record)?;
        }
        Ok(())
    }

    /// Close the current segment; the next record opens a new one
    pub fn rotate(&mut self) -> io::Result<()> {
        if let Some(segment) = self.current.take() {
            self.finished.push(segment.finalize()?);
        }
        self.policy.reset();
        Ok(())
    }

    /// Finalize the open segment and return all completed segment paths
    pub fn finish(mut self) -> io::Result<Vec<PathBuf>> {
        self.rotate()?;
        log::info!(
            "Wrote {} status records to {} segment(s) in {}",
            self.total_records,
            self.finished.len(),
            self.output_dir.display()
        );
        Ok(self.finished)
    }
}

/// Remove stale .tmp files in the output directory
pub fn cleanup_tmp_files(output_dir: &Path) -> io::Result<()> {
    for entry in fs::read_dir(output_dir)? {
        let path = entry?.path();
        if path.extension().is_some_and(|ext| ext == "tmp") {
            log::warn!("Removing stale tmp file: {}", path.display());
            fs::remove_file(&path)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::Metadata;
    use crate::status::Status;

    fn record(i: usize) -> StatusRecord {
        let mut md = Metadata::new();
        md.set_value("n", i.to_string());
        StatusRecord::new(format!("https://example.org/{i}"), md, Status::Discovered)
    }

    fn read_records(path: &Path) -> Vec<StatusRecord> {
        fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn single_segment_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = SegmentSink::new(dir.path(), "status", RotationPolicy::new(u64::MAX)).unwrap();
        sink.write_all(&[record(0), record(1)]).unwrap();
        let paths = sink.finish().unwrap();

        assert_eq!(paths, vec![dir.path().join("status-00000.jsonl")]);
        let records = read_records(&paths[0]);
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].url, "https://example.org/1");
        assert_eq!(records[1].status, Status::Discovered);
    }

    #[test]
    fn rotates_into_numbered_segments() {
        let dir = tempfile::tempdir().unwrap();
        // every record is larger than the limit, so each lands in its own segment
        let mut sink = SegmentSink::new(dir.path(), "status", RotationPolicy::new(10)).unwrap();
        for i in 0..3 {
            sink.write(&record(i)).unwrap();
        }
        let paths = sink.finish().unwrap();

        assert_eq!(paths.len(), 3);
        assert!(paths[2].ends_with("status-00002.jsonl"));
        for (i, path) in paths.iter().enumerate() {
            let records = read_records(path);
            assert_eq!(records.len(), 1);
            assert_eq!(records[0].metadata.get_first("n"), Some(i.to_string().as_str()));
        }
    }

    #[test]
    fn no_tmp_left_after_finish() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = SegmentSink::new(dir.path(), "s", RotationPolicy::new(u64::MAX)).unwrap();
        sink.write(&record(0)).unwrap();
        assert!(dir.path().join("s-00000.jsonl.tmp").exists());
        sink.finish().unwrap();
        assert!(!dir.path().join("s-00000.jsonl.tmp").exists());
        assert!(dir.path().join("s-00000.jsonl").exists());
    }

    #[test]
    fn finish_without_records_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let sink = SegmentSink::new(dir.path(), "s", RotationPolicy::new(100)).unwrap();
        assert!(sink.finish().unwrap().is_empty());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn cleanup_tmp_files_removes_only_tmp() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.jsonl.tmp"), b"stale").unwrap();
        fs::write(dir.path().join("b.jsonl"), b"done").unwrap();

        cleanup_tmp_files(dir.path()).unwrap();

        assert!(!dir.path().join("a.jsonl.tmp").exists());
        assert!(dir.path().join("b.jsonl").exists());
    }
}
