//! Append-only journal: length-prefixed JSON frames.
//!
//! Storage format:
//!   [4-byte LE length][JSON record][4-byte LE length][JSON record]...
//!
//! Rules:
//!   - Strict append only, no mutation, no deletion, no reordering
//!   - fsync after every write
//!   - A short or oversize frame is corruption, never silently dropped

use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use crate::error::HostError;
use crate::record::EventRecord;

/// Upper bound for a single frame.
pub const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

#[derive(Debug)]
pub struct Journal {
    path: PathBuf,
}

impl Journal {
    /// Open or create a journal and return every record already in it.
    pub fn open(path: &Path) -> Result<(Self, Vec<EventRecord>), HostError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let records = if path.exists() {
            Self::read_all_from_file(path)?
        } else {
            Vec::new()
        };
        Ok((
            Self {
                path: path.to_path_buf(),
            },
            records,
        ))
    }

    /// Append one record and fsync.
    pub fn append(&mut self, record: &EventRecord) -> Result<(), HostError> {
        let buf = serde_json::to_vec(record)?;
        if buf.len() > MAX_FRAME_LEN {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("record of {} bytes exceeds frame limit", buf.len()),
            )
            .into());
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        {
            let mut writer = BufWriter::new(&mut file);
            writer.write_all(&(buf.len() as u32).to_le_bytes())?;
            writer.write_all(&buf)?;
            writer.flush()?;
        }
        file.sync_all()?;
        Ok(())
    }

    fn read_all_from_file(path: &Path) -> Result<Vec<EventRecord>, HostError> {
        let mut reader = BufReader::new(File::open(path)?);
        let mut records = Vec::new();
        let mut offset: u64 = 0;
        let mut len_buf = [0u8; 4];

        loop {
            match reader.read_exact(&mut len_buf) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                    // A clean end lands exactly on a frame boundary.
                    if Self::at_end(path, offset)? {
                        break;
                    }
                    return Err(HostError::CorruptJournal {
                        offset,
                        reason: "truncated frame header".to_string(),
                    });
                }
                Err(e) => return Err(e.into()),
            }

            let len = u32::from_le_bytes(len_buf) as usize;
            if len == 0 || len > MAX_FRAME_LEN {
                return Err(HostError::CorruptJournal {
                    offset,
                    reason: format!("invalid frame length {}", len),
                });
            }

            let mut frame = vec![0u8; len];
            reader
                .read_exact(&mut frame)
                .map_err(|e| HostError::CorruptJournal {
                    offset,
                    reason: format!("truncated frame: {}", e),
                })?;

            let record: EventRecord =
                serde_json::from_slice(&frame).map_err(|e| HostError::CorruptJournal {
                    offset,
                    reason: format!("undecodable record: {}", e),
                })?;
            records.push(record);
            offset += 4 + len as u64;
        }

        Ok(records)
    }

    fn at_end(path: &Path, offset: u64) -> Result<bool, HostError> {
        Ok(std::fs::metadata(path)?.len() == offset)
    }
}
