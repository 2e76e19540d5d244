//! MDF4 (Measurement Data Format 4) file reader
//!
//! Native reader for ASAM MDF 4.x measurement files, covering exactly
//! what the pipeline needs: channel names and the sample values of a
//! handful of signals. It walks the HD → DG → CG → CN block chain and
//! reads fixed-length records out of `##DT` data blocks.
//!
//! ## Supported layout
//! - Sorted files: one channel group per data group, no record ids
//! - Fixed-length, byte-aligned channels (bit offset 0, whole bytes)
//! - Integer (LE/BE, signed/unsigned) and float (4/8 byte) data types
//! - Identity and linear (`##CC` type 1) value conversion
//!
//! Anything else still contributes its channel NAMES, but sample
//! extraction degrades to an empty array. That matches the pipeline's
//! policy of reporting a signal as missing rather than aborting.

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use std::collections::HashSet;
use std::path::Path;

use crate::types::{AnalysisError, Result};

/// Minimum MDF version with the 4.x block layout
const MIN_VERSION: u16 = 400;

/// Block header size: id (4) + reserved (4) + length (8) + link count (8)
const BLOCK_HEADER_LEN: usize = 24;

/// File offset of the HD block, right after the 64-byte ID block
const HD_OFFSET: u64 = 64;

/// An opened MDF4 file with its channel index
pub struct Mf4File {
    buf: Vec<u8>,
    channels: Vec<ChannelEntry>,
    groups: Vec<GroupLayout>,
}

/// One `##CN` channel and where its bytes live in the record
struct ChannelEntry {
    name: String,
    group: usize,
    byte_offset: u32,
    bit_offset: u8,
    bit_count: u32,
    data_type: u8,
    /// Linear conversion (offset, factor); None means identity
    conversion: Option<(f64, f64)>,
}

/// Record layout of one channel group
struct GroupLayout {
    /// Payload range of the `##DT` block, if the group is readable
    data: Option<(usize, usize)>,
    record_size: usize,
    cycle_count: u64,
}

/// A decoded block header with its links and data range
struct Block {
    id: [u8; 4],
    links: Vec<u64>,
    data_start: usize,
    data_end: usize,
}

impl Mf4File {
    /// Open and index an MDF4 file.
    ///
    /// Fails on files that are not MDF 4.x at all; structural surprises
    /// inside the file only reduce what can be extracted.
    pub fn open(path: &Path) -> Result<Self> {
        log::info!("Parsing MDF file: {:?}", path);

        if !path.exists() {
            return Err(AnalysisError::MeasurementParseError(format!(
                "MDF file not found: {:?}",
                path
            )));
        }

        let buf = std::fs::read(path)?;
        Self::from_bytes(buf)
    }

    /// Index an MDF4 file already loaded into memory
    pub fn from_bytes(buf: Vec<u8>) -> Result<Self> {
        if buf.len() < HD_OFFSET as usize + BLOCK_HEADER_LEN {
            return Err(AnalysisError::MeasurementParseError(
                "file too short for an MDF header".to_string(),
            ));
        }
        if &buf[0..3] != b"MDF" {
            return Err(AnalysisError::MeasurementParseError(
                "missing MDF file magic".to_string(),
            ));
        }
        let version = LittleEndian::read_u16(&buf[28..30]);
        if version < MIN_VERSION {
            return Err(AnalysisError::MeasurementParseError(format!(
                "unsupported MDF version {} (need 4.x)",
                version
            )));
        }

        let mut file = Self {
            buf,
            channels: Vec::new(),
            groups: Vec::new(),
        };
        file.index()?;
        log::debug!("MDF index: {} channels", file.channels.len());
        Ok(file)
    }

    /// All channel names found in the file, in block order
    pub fn channel_names(&self) -> Vec<&str> {
        self.channels.iter().map(|c| c.name.as_str()).collect()
    }

    /// Extract the physical sample values of one channel (exact name).
    ///
    /// Unsupported layouts yield an empty vector, not an error.
    pub fn samples(&self, name: &str) -> Result<Vec<f64>> {
        let Some(entry) = self.channels.iter().find(|c| c.name == name) else {
            return Ok(Vec::new());
        };
        let group = &self.groups[entry.group];
        let Some((data_start, data_end)) = group.data else {
            log::debug!("Channel '{}' lives in an unreadable group", name);
            return Ok(Vec::new());
        };

        // Byte-aligned fixed-width values only
        if entry.bit_offset != 0 || entry.bit_count == 0 || entry.bit_count % 8 != 0 {
            log::debug!("Channel '{}' is not byte aligned; skipping", name);
            return Ok(Vec::new());
        }
        let nbytes = (entry.bit_count / 8) as usize;
        let supported = match entry.data_type {
            0..=3 => nbytes <= 8,
            4 | 5 => nbytes == 4 || nbytes == 8,
            _ => false,
        };
        if !supported {
            log::debug!(
                "Channel '{}' has unsupported data type {} ({} bytes); skipping",
                name,
                entry.data_type,
                nbytes
            );
            return Ok(Vec::new());
        }

        let record_size = group.record_size;
        if record_size == 0 {
            return Ok(Vec::new());
        }
        let available = (data_end - data_start) / record_size;
        let count = (group.cycle_count as usize).min(available);

        let mut values = Vec::with_capacity(count);
        for i in 0..count {
            let start = data_start + i * record_size + entry.byte_offset as usize;
            let end = start + nbytes;
            if end > data_end {
                break;
            }
            let raw = decode_value(&self.buf[start..end], entry.data_type);
            let value = match entry.conversion {
                Some((offset, factor)) => offset + factor * raw,
                None => raw,
            };
            values.push(value);
        }
        Ok(values)
    }

    /// Walk HD → DG → CG → CN and build the channel index
    fn index(&mut self) -> Result<()> {
        let hd = self.block_at(HD_OFFSET)?;
        if &hd.id != b"##HD" {
            return Err(AnalysisError::MeasurementParseError(
                "HD block not found at offset 64".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        let mut dg_link = hd.links.first().copied().unwrap_or(0);
        while dg_link != 0 && seen.insert(dg_link) {
            match self.index_data_group(dg_link) {
                Ok(next) => dg_link = next,
                Err(e) => {
                    // One corrupt group leaves the rest of the file usable
                    log::warn!("Skipping malformed data group at 0x{:X}: {}", dg_link, e);
                    break;
                }
            }
        }
        Ok(())
    }

    fn index_data_group(&mut self, dg_link: u64) -> Result<u64> {
        let dg = self.expect_block(dg_link, b"##DG")?;
        let next = dg.links.first().copied().unwrap_or(0);
        let cg_first = dg.links.get(1).copied().unwrap_or(0);
        let data_link = dg.links.get(2).copied().unwrap_or(0);
        let rec_id_size = *self
            .buf
            .get(dg.data_start)
            .ok_or_else(|| malformed("DG data section truncated"))?;

        // Count channel groups first: only sorted groups (single CG,
        // no record ids) have extractable records.
        let mut cg_links = Vec::new();
        let mut seen = HashSet::new();
        let mut cg_link = cg_first;
        while cg_link != 0 && seen.insert(cg_link) {
            let cg = self.expect_block(cg_link, b"##CG")?;
            let next_cg = cg.links.first().copied().unwrap_or(0);
            cg_links.push(cg_link);
            cg_link = next_cg;
        }
        let sorted = cg_links.len() == 1 && rec_id_size == 0;
        if !sorted && !cg_links.is_empty() {
            log::debug!(
                "Data group at 0x{:X} is unsorted ({} CGs, rec id size {}); names only",
                dg_link,
                cg_links.len(),
                rec_id_size
            );
        }

        for cg_link in cg_links {
            let cg = self.expect_block(cg_link, b"##CG")?;
            let cn_first = cg.links.get(1).copied().unwrap_or(0);
            if cg.data_end < cg.data_start + 32 {
                return Err(malformed("CG data section truncated"));
            }
            let cycle_count = LittleEndian::read_u64(&self.buf[cg.data_start + 8..cg.data_start + 16]);
            let data_bytes =
                LittleEndian::read_u32(&self.buf[cg.data_start + 24..cg.data_start + 28]);
            let inval_bytes =
                LittleEndian::read_u32(&self.buf[cg.data_start + 28..cg.data_start + 32]);

            let data = if sorted {
                self.data_block_payload(data_link)
            } else {
                None
            };

            let group_index = self.groups.len();
            self.groups.push(GroupLayout {
                data,
                record_size: (data_bytes + inval_bytes) as usize,
                cycle_count,
            });

            let mut seen_cn = HashSet::new();
            let mut cn_link = cn_first;
            while cn_link != 0 && seen_cn.insert(cn_link) {
                cn_link = self.index_channel(cn_link, group_index)?;
            }
        }

        Ok(next)
    }

    fn index_channel(&mut self, cn_link: u64, group_index: usize) -> Result<u64> {
        let cn = self.expect_block(cn_link, b"##CN")?;
        let next = cn.links.first().copied().unwrap_or(0);
        let tx_link = cn.links.get(2).copied().unwrap_or(0);
        let cc_link = cn.links.get(4).copied().unwrap_or(0);

        if cn.data_end < cn.data_start + 12 {
            return Err(malformed("CN data section truncated"));
        }
        let data = &self.buf[cn.data_start..cn.data_end];
        let data_type = data[2];
        let bit_offset = data[3];
        let byte_offset = LittleEndian::read_u32(&data[4..8]);
        let bit_count = LittleEndian::read_u32(&data[8..12]);

        let Some(name) = self.text_at(tx_link) else {
            log::debug!("Channel at 0x{:X} has no name block; skipping", cn_link);
            return Ok(next);
        };

        let conversion = self.linear_conversion_at(cc_link);

        self.channels.push(ChannelEntry {
            name,
            group: group_index,
            byte_offset,
            bit_offset,
            bit_count,
            data_type,
            conversion,
        });
        Ok(next)
    }

    /// Payload range of the data block, if it is a plain `##DT`.
    /// Data lists (`##DL`) and compressed blocks (`##DZ`) are not
    /// supported; the group then reports no samples.
    fn data_block_payload(&self, link: u64) -> Option<(usize, usize)> {
        if link == 0 {
            return None;
        }
        let block = self.block_at(link).ok()?;
        if &block.id == b"##DT" {
            Some((block.data_start, block.data_end))
        } else {
            log::debug!(
                "Unsupported data block {} at 0x{:X}; names only",
                String::from_utf8_lossy(&block.id),
                link
            );
            None
        }
    }

    /// Zero-terminated string from a `##TX` block
    fn text_at(&self, link: u64) -> Option<String> {
        if link == 0 {
            return None;
        }
        let block = self.block_at(link).ok()?;
        if &block.id != b"##TX" {
            return None;
        }
        let raw = &self.buf[block.data_start..block.data_end];
        let text = match raw.iter().position(|b| *b == 0) {
            Some(pos) => &raw[..pos],
            None => raw,
        };
        Some(String::from_utf8_lossy(text).trim().to_string())
    }

    /// (offset, factor) from a `##CC` block.
    ///
    /// Type 0 (identity) yields None; type 1 (linear) yields the two
    /// parameters; other conversion types fall back to raw values.
    fn linear_conversion_at(&self, link: u64) -> Option<(f64, f64)> {
        if link == 0 {
            return None;
        }
        let block = self.block_at(link).ok()?;
        if &block.id != b"##CC" || block.data_end < block.data_start + 24 {
            return None;
        }
        let data = &self.buf[block.data_start..block.data_end];
        let cc_type = data[0];
        let val_count = LittleEndian::read_u16(&data[6..8]) as usize;
        match cc_type {
            0 => None,
            1 if val_count >= 2 && data.len() >= 24 + 16 => {
                let offset = LittleEndian::read_f64(&data[24..32]);
                let factor = LittleEndian::read_f64(&data[32..40]);
                Some((offset, factor))
            }
            other => {
                log::debug!("Unsupported CC conversion type {}; using raw values", other);
                None
            }
        }
    }

    fn expect_block(&self, offset: u64, id: &[u8; 4]) -> Result<Block> {
        let block = self.block_at(offset)?;
        if &block.id != id {
            return Err(malformed(&format!(
                "expected {} block at 0x{:X}, found {}",
                String::from_utf8_lossy(id),
                offset,
                String::from_utf8_lossy(&block.id)
            )));
        }
        Ok(block)
    }

    fn block_at(&self, offset: u64) -> Result<Block> {
        let start = offset as usize;
        let header_end = start
            .checked_add(BLOCK_HEADER_LEN)
            .ok_or_else(|| malformed(&format!("block offset 0x{:X} out of range", offset)))?;
        if start == 0 || header_end > self.buf.len() {
            return Err(malformed(&format!("block offset 0x{:X} out of range", offset)));
        }
        let id = [
            self.buf[start],
            self.buf[start + 1],
            self.buf[start + 2],
            self.buf[start + 3],
        ];
        let length = LittleEndian::read_u64(&self.buf[start + 8..start + 16]) as usize;
        let link_count = LittleEndian::read_u64(&self.buf[start + 16..start + 24]) as usize;

        // Both fields come straight from the file; checked math keeps a
        // corrupt header on the error path instead of panicking.
        let link_bytes = link_count
            .checked_mul(8)
            .and_then(|n| n.checked_add(BLOCK_HEADER_LEN))
            .ok_or_else(|| {
                malformed(&format!(
                    "block at 0x{:X} has absurd link count {}",
                    offset, link_count
                ))
            })?;
        let end = start
            .checked_add(length)
            .ok_or_else(|| malformed("block length overflow"))?;
        if length < link_bytes || end > self.buf.len() {
            return Err(malformed(&format!(
                "block at 0x{:X} has inconsistent length {}",
                offset, length
            )));
        }

        let mut links = Vec::with_capacity(link_count);
        for i in 0..link_count {
            let o = start + BLOCK_HEADER_LEN + i * 8;
            links.push(LittleEndian::read_u64(&self.buf[o..o + 8]));
        }

        Ok(Block {
            id,
            links,
            data_start: start + link_bytes,
            data_end: end,
        })
    }
}

/// Decode one raw value according to the MDF channel data type
fn decode_value(bytes: &[u8], data_type: u8) -> f64 {
    let n = bytes.len();
    match data_type {
        // Unsigned integer
        0 => LittleEndian::read_uint(bytes, n) as f64,
        1 => BigEndian::read_uint(bytes, n) as f64,
        // Signed integer
        2 => LittleEndian::read_int(bytes, n) as f64,
        3 => BigEndian::read_int(bytes, n) as f64,
        // IEEE float
        4 if n == 4 => LittleEndian::read_f32(bytes) as f64,
        4 => LittleEndian::read_f64(bytes),
        5 if n == 4 => BigEndian::read_f32(bytes) as f64,
        5 => BigEndian::read_f64(bytes),
        _ => f64::NAN,
    }
}

fn malformed(message: &str) -> AnalysisError {
    AnalysisError::MeasurementParseError(message.to_string())
}
