//! # Section-Tagged Binary Container
//!
//! The container shared by snarkjs `ptau`/`zkey`, circom `r1cs` and the
//! tessera ceremony artifacts:
//!
//! ```text
//! magic[4] | version u32 | nSections u32 | { tag u32 | size u64 | payload[size] }*
//! ```
//!
//! All integers are little-endian. [`SectionReader::open`] walks the table
//! once, recording every segment and rejecting any whose declared size runs
//! past the end of the stream. Formats read a section by seeking to it with
//! [`SectionReader::seek_unique_section`], which refuses sections that appear
//! more than once.

use std::collections::BTreeMap;
use std::io::{self, Read, Seek, SeekFrom, Write};

use num_bigint::BigUint;

use crate::error::CeremonyFileError;

/// Container version every supported format uses.
pub const CONTAINER_VERSION: u32 = 1;

/// One segment of the section table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Section {
    /// Section tag.
    pub tag: u32,
    /// Offset of the payload from the start of the stream.
    pub offset: u64,
    /// Payload size in bytes.
    pub size: u64,
}

impl Section {
    /// Offset one past the payload.
    pub fn end(&self) -> u64 {
        self.offset + self.size
    }
}

/// Reader over a section-tagged container.
pub struct SectionReader<R> {
    inner: R,
    magic: [u8; 4],
    version: u32,
    sections: BTreeMap<u32, Vec<Section>>,
}

impl<R: Read + Seek> SectionReader<R> {
    /// Validate the magic and index the section table.
    pub fn open(mut inner: R, magic: &[u8; 4]) -> Result<Self, CeremonyFileError> {
        let len = inner.seek(SeekFrom::End(0))?;
        inner.seek(SeekFrom::Start(0))?;

        let mut found = [0u8; 4];
        read_exact(&mut inner, &mut found)?;
        if &found != magic {
            return Err(CeremonyFileError::BadMagic {
                expected: String::from_utf8_lossy(magic).into_owned(),
                found: String::from_utf8_lossy(&found).into_owned(),
            });
        }
        let version = read_u32(&mut inner)?;
        let count = read_u32(&mut inner)?;

        let mut sections: BTreeMap<u32, Vec<Section>> = BTreeMap::new();
        for _ in 0..count {
            let tag = read_u32(&mut inner)?;
            let size = read_u64(&mut inner)?;
            let offset = inner.stream_position()?;
            let end = offset
                .checked_add(size)
                .filter(|end| *end <= len)
                .ok_or(CeremonyFileError::SectionOverrun { tag, offset, size })?;
            sections.entry(tag).or_default().push(Section { tag, offset, size });
            inner.seek(SeekFrom::Start(end))?;
        }

        Ok(Self {
            inner,
            magic: *magic,
            version,
            sections,
        })
    }

    /// Container version from the file header.
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Fail unless the container version is [`CONTAINER_VERSION`].
    pub fn require_version(&self) -> Result<(), CeremonyFileError> {
        if self.version == CONTAINER_VERSION {
            Ok(())
        } else {
            Err(CeremonyFileError::UnsupportedVersion {
                magic: String::from_utf8_lossy(&self.magic).into_owned(),
                version: self.version,
            })
        }
    }

    /// All segments recorded for `tag`, in file order.
    pub fn segments(&self, tag: u32) -> &[Section] {
        self.sections.get(&tag).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Whether at least one segment with `tag` exists.
    pub fn has_section(&self, tag: u32) -> bool {
        !self.segments(tag).is_empty()
    }

    /// Seek to the start of the single segment tagged `tag`.
    pub fn seek_unique_section(&mut self, tag: u32) -> Result<Section, CeremonyFileError> {
        let section = match self.segments(tag) {
            [] => return Err(CeremonyFileError::MissingSection { tag }),
            [section] => *section,
            many => {
                return Err(CeremonyFileError::MultiSegmentSection {
                    tag,
                    count: many.len(),
                })
            }
        };
        self.inner.seek(SeekFrom::Start(section.offset))?;
        Ok(section)
    }

    /// Read the whole payload of the unique segment tagged `tag`.
    pub fn read_section(&mut self, tag: u32) -> Result<Vec<u8>, CeremonyFileError> {
        let section = self.seek_unique_section(tag)?;
        // Bounded by the stream length, checked in `open`.
        let mut payload = vec![0u8; section.size as usize];
        read_exact(&mut self.inner, &mut payload)?;
        Ok(payload)
    }

    /// Read the payload of `tag`, requiring exactly `expected` bytes.
    pub fn read_section_sized(
        &mut self,
        tag: u32,
        expected: u64,
    ) -> Result<Vec<u8>, CeremonyFileError> {
        let section = self.seek_unique_section(tag)?;
        check_size(&section, expected)?;
        self.read_section(tag)
    }

    /// Fail unless the stream sits exactly at the end of `section`.
    pub fn expect_section_end(&mut self, section: &Section) -> Result<(), CeremonyFileError> {
        let position = self.inner.stream_position()?;
        if position == section.end() {
            Ok(())
        } else {
            Err(CeremonyFileError::SectionLength {
                tag: section.tag,
                expected: position.saturating_sub(section.offset),
                actual: section.size,
            })
        }
    }

    /// Read `buf.len()` bytes at the current position.
    pub fn read_bytes(&mut self, buf: &mut [u8]) -> Result<(), CeremonyFileError> {
        read_exact(&mut self.inner, buf)
    }

    /// Read a little-endian `u32`.
    pub fn read_u32(&mut self) -> Result<u32, CeremonyFileError> {
        read_u32(&mut self.inner)
    }

    /// Read a little-endian `u64`.
    pub fn read_u64(&mut self) -> Result<u64, CeremonyFileError> {
        read_u64(&mut self.inner)
    }

    /// Read an `n8`-byte little-endian unsigned integer.
    pub fn read_biguint(&mut self, n8: usize) -> Result<BigUint, CeremonyFileError> {
        let mut bytes = vec![0u8; n8];
        read_exact(&mut self.inner, &mut bytes)?;
        bytes.reverse();
        Ok(BigUint::from_bytes_be(&bytes))
    }
}

/// Fail unless `section` holds exactly `expected` bytes.
pub fn check_size(section: &Section, expected: u64) -> Result<(), CeremonyFileError> {
    if section.size == expected {
        Ok(())
    } else {
        Err(CeremonyFileError::SectionLength {
            tag: section.tag,
            expected,
            actual: section.size,
        })
    }
}

fn read_exact<R: Read>(inner: &mut R, buf: &mut [u8]) -> Result<(), CeremonyFileError> {
    inner.read_exact(buf).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => CeremonyFileError::Truncated,
        _ => CeremonyFileError::Io(e),
    })
}

fn read_u32<R: Read>(inner: &mut R) -> Result<u32, CeremonyFileError> {
    let mut buf = [0u8; 4];
    read_exact(inner, &mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_u64<R: Read>(inner: &mut R) -> Result<u64, CeremonyFileError> {
    let mut buf = [0u8; 8];
    read_exact(inner, &mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

// -- Writing -----------------------------------------------------------------

/// Builder for a section-tagged container. Sections are emitted in the
/// order they were added.
#[derive(Debug, Clone)]
pub struct SectionWriter {
    magic: [u8; 4],
    version: u32,
    sections: Vec<(u32, Vec<u8>)>,
}

impl SectionWriter {
    /// Start a container with [`CONTAINER_VERSION`].
    pub fn new(magic: &[u8; 4]) -> Self {
        Self {
            magic: *magic,
            version: CONTAINER_VERSION,
            sections: Vec::new(),
        }
    }

    /// Override the container version.
    pub fn with_version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    /// Append a section.
    pub fn section(&mut self, tag: u32, payload: Vec<u8>) -> &mut Self {
        self.sections.push((tag, payload));
        self
    }

    /// Write the container to `out`.
    pub fn write_to<W: Write + ?Sized>(&self, out: &mut W) -> io::Result<()> {
        out.write_all(&self.magic)?;
        out.write_all(&self.version.to_le_bytes())?;
        out.write_all(&(self.sections.len() as u32).to_le_bytes())?;
        for (tag, payload) in &self.sections {
            out.write_all(&tag.to_le_bytes())?;
            out.write_all(&(payload.len() as u64).to_le_bytes())?;
            out.write_all(payload)?;
        }
        Ok(())
    }

    /// Serialize the container into a byte vector.
    pub fn to_bytes(&self) -> Vec<u8> {
        let len = 12 + self.sections.iter().map(|(_, p)| 12 + p.len()).sum::<usize>();
        let mut out = Vec::with_capacity(len);
        out.extend_from_slice(&self.magic);
        out.extend_from_slice(&self.version.to_le_bytes());
        out.extend_from_slice(&(self.sections.len() as u32).to_le_bytes());
        for (tag, payload) in &self.sections {
            out.extend_from_slice(&tag.to_le_bytes());
            out.extend_from_slice(&(payload.len() as u64).to_le_bytes());
            out.extend_from_slice(payload);
        }
        out
    }
}

/// Little-endian `n8`-byte encoding of `value`, zero padded.
pub fn biguint_le(value: &BigUint, n8: usize) -> Vec<u8> {
    let mut bytes = value.to_bytes_le();
    bytes.resize(n8, 0);
    bytes
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::error::FileErrorKind;

    fn container(sections: &[(u32, Vec<u8>)]) -> Vec<u8> {
        let mut w = SectionWriter::new(b"test");
        for (tag, payload) in sections {
            w.section(*tag, payload.clone());
        }
        w.to_bytes()
    }

    #[test]
    fn indexes_sections_and_reads_payloads() {
        let bytes = container(&[(1, vec![1, 0, 0, 0]), (2, vec![9; 5])]);
        let mut r = SectionReader::open(Cursor::new(bytes), b"test").unwrap();
        r.require_version().unwrap();
        assert_eq!(r.segments(1).len(), 1);
        assert!(!r.has_section(3));
        assert_eq!(r.read_section(2).unwrap(), vec![9; 5]);

        let header = r.seek_unique_section(1).unwrap();
        assert_eq!(r.read_u32().unwrap(), 1);
        r.expect_section_end(&header).unwrap();
    }

    #[test]
    fn rejects_wrong_magic() {
        let bytes = container(&[]);
        let err = SectionReader::open(Cursor::new(bytes), b"ptau").err().unwrap();
        assert!(matches!(err, CeremonyFileError::BadMagic { .. }));
    }

    #[test]
    fn rejects_short_stream() {
        let err = SectionReader::open(Cursor::new(b"te".to_vec()), b"test").err().unwrap();
        assert!(matches!(err, CeremonyFileError::Truncated));
    }

    #[test]
    fn rejects_section_overrunning_the_file() {
        let mut bytes = container(&[(1, vec![0; 8])]);
        bytes.truncate(bytes.len() - 1);
        let err = SectionReader::open(Cursor::new(bytes), b"test").err().unwrap();
        assert!(matches!(err, CeremonyFileError::SectionOverrun { tag: 1, .. }));
    }

    #[test]
    fn rejects_multi_segment_sections() {
        let bytes = container(&[(2, vec![1]), (2, vec![2])]);
        let mut r = SectionReader::open(Cursor::new(bytes), b"test").unwrap();
        assert_eq!(r.segments(2).len(), 2);
        let err = r.seek_unique_section(2).unwrap_err();
        assert!(matches!(err, CeremonyFileError::MultiSegmentSection { tag: 2, count: 2 }));
        assert_eq!(err.kind(), FileErrorKind::MalformedFile);
    }

    #[test]
    fn reports_missing_sections() {
        let bytes = container(&[(1, vec![])]);
        let mut r = SectionReader::open(Cursor::new(bytes), b"test").unwrap();
        assert!(matches!(
            r.seek_unique_section(7).unwrap_err(),
            CeremonyFileError::MissingSection { tag: 7 }
        ));
    }

    #[test]
    fn sized_read_checks_length() {
        let bytes = container(&[(1, vec![0; 10])]);
        let mut r = SectionReader::open(Cursor::new(bytes), b"test").unwrap();
        assert!(matches!(
            r.read_section_sized(1, 12).unwrap_err(),
            CeremonyFileError::SectionLength { tag: 1, expected: 12, actual: 10 }
        ));
        assert_eq!(r.read_section_sized(1, 10).unwrap().len(), 10);
    }

    #[test]
    fn unread_section_tail_is_detected() {
        let bytes = container(&[(1, vec![0; 8])]);
        let mut r = SectionReader::open(Cursor::new(bytes), b"test").unwrap();
        let s = r.seek_unique_section(1).unwrap();
        r.read_u32().unwrap();
        assert!(r.expect_section_end(&s).is_err());
    }

    #[test]
    fn biguint_is_little_endian() {
        let bytes = container(&[(1, vec![0x01, 0x02, 0, 0])]);
        let mut r = SectionReader::open(Cursor::new(bytes), b"test").unwrap();
        r.seek_unique_section(1).unwrap();
        assert_eq!(r.read_biguint(4).unwrap(), BigUint::from(0x0201u32));
        assert_eq!(biguint_le(&BigUint::from(0x0201u32), 4), vec![1, 2, 0, 0]);
    }

    #[test]
    fn version_is_checked_on_request() {
        let mut w = SectionWriter::new(b"test").with_version(2);
        w.section(1, vec![]);
        let r = SectionReader::open(Cursor::new(w.to_bytes()), b"test").unwrap();
        assert_eq!(r.version(), 2);
        assert!(matches!(
            r.require_version().unwrap_err(),
            CeremonyFileError::UnsupportedVersion { version: 2, .. }
        ));
    }

    #[test]
    fn write_to_matches_to_bytes() {
        let mut w = SectionWriter::new(b"test");
        w.section(1, vec![1, 2, 3]).section(4, vec![]);
        let mut out = Vec::new();
        w.write_to(&mut out).unwrap();
        assert_eq!(out, w.to_bytes());
    }

    proptest::proptest! {
        #[test]
        fn arbitrary_bytes_never_panic(bytes in proptest::collection::vec(proptest::num::u8::ANY, 0..256)) {
            let mut prefixed = b"test".to_vec();
            prefixed.extend(bytes);
            if let Ok(mut r) = SectionReader::open(Cursor::new(prefixed), b"test") {
                for tag in 0..4 {
                    let _ = r.read_section(tag);
                }
            }
        }
    }
}
