use byteorder::{BigEndian, ReadBytesExt};
use log::debug;
use std::io::{self, Read, Seek, SeekFrom};

use crate::error::{ModError, ReadFailure};

pub mod info;

// 20 + 31 * (22 + 2 + 1 + 1 + 2 + 2) + 1 + 1 + 128
pub const HEADER_LEN: usize = 1080;
pub const TAG_OFFSET: u64 = HEADER_LEN as u64;
pub const NUM_INSTRUMENTS: usize = 31;
pub const NUM_ORDERS: usize = 128;
pub const TITLE_LEN: usize = 20;
pub const NAME_LEN: usize = 22;

const ROWS_PER_PATTERN: u64 = 64;
const BYTES_PER_NOTE: u64 = 4;

pub struct ModuleHeader {
    pub title: [u8; TITLE_LEN],
    pub instruments: Vec<Instrument>,
    pub order_length: u8,
    pub orders: [u8; NUM_ORDERS],
}

pub struct Instrument {
    pub name: [u8; NAME_LEN],
    /// Sample length in 16-bit words, already in native byte order.
    pub length_words: u16,
    pub finetune: u8,
    pub volume: u8,
    pub loop_start_words: u16,
    pub loop_length_words: u16,
}

/// A classified module with the reader left at the first sample byte.
pub struct ProtrackerMod {
    pub header: ModuleHeader,
    pub channels: u8,
    pub pattern_count: u16,
    pub sample_data_offset: u64,
}

impl ModuleHeader {
    /// The title up to its first zero byte.
    pub fn title_bytes(&self) -> &[u8] {
        trim_nul(&self.title)
    }

    /// Number of distinct patterns stored between header and sample data.
    ///
    /// Scans the whole order table, not just the first `order_length`
    /// entries; padding after the song end can still raise the maximum.
    pub fn pattern_count(&self) -> u16 {
        let max = self.orders.iter().copied().max().unwrap_or(0);
        u16::from(max) + 1
    }
}

impl Instrument {
    pub fn name_bytes(&self) -> &[u8] {
        trim_nul(&self.name)
    }

    pub fn byte_len(&self) -> usize {
        usize::from(self.length_words) * 2
    }
}

impl ProtrackerMod {
    /// Classify, decode and position `r` at the start of the sample payloads.
    pub fn open<R>(r: &mut R) -> Result<ProtrackerMod, ModError>
    where
        R: Read + Seek,
    {
        r.seek(SeekFrom::Start(TAG_OFFSET))
            .map_err(ModError::SeekMagic)?;

        let mut tag = [0u8; 4];
        read_full(r, &mut tag).map_err(ModError::ReadMagic)?;
        let channels = channels_for_tag(&tag)?;

        // go back to start of file
        r.seek(SeekFrom::Start(0)).map_err(ModError::SeekStart)?;
        let header = read_header(r)?;

        let pattern_count = header.pattern_count();
        let sample_data_offset = sample_data_offset(channels, pattern_count);
        seek_within(r, sample_data_offset).map_err(ModError::SeekSampleData)?;

        debug!(
            "channels: {}, patterns: {}, sample data at {:#x}",
            channels, pattern_count, sample_data_offset
        );

        Ok(ProtrackerMod {
            header,
            channels,
            pattern_count,
            sample_data_offset,
        })
    }
}

/// Map the 4-byte tag at offset 1080 to a channel count.
pub fn channels_for_tag(tag: &[u8; 4]) -> Result<u8, ModError> {
    let digit = |b: u8| if b.is_ascii_digit() { Some(b - b'0') } else { None };

    let channels = match tag {
        b"M.K." | b"M!K!" | b"M&K!" => 4,
        [n, b'C', b'H', b'N'] if n.is_ascii_digit() => n - b'0',
        [b'F', b'L', b'T', n] | [b'T', b'D', b'Z', n] if n.is_ascii_digit() => n - b'0',
        [tens, ones, b'C', b'H'] | [tens, ones, b'C', b'N'] => {
            match (digit(*tens), digit(*ones)) {
                (Some(tens), Some(ones)) => tens * 10 + ones,
                _ => return Err(ModError::UnrecognizedTag(*tag)),
            }
        }
        b"CD81" | b"OKTA" | b"OCTA" => 8,
        _ => return Err(ModError::UnrecognizedTag(*tag)),
    };

    if channels < 1 {
        return Err(ModError::InvalidChannelCount);
    }
    Ok(channels)
}

/// Absolute file offset of the first sample payload.
pub fn sample_data_offset(channels: u8, pattern_count: u16) -> u64 {
    TAG_OFFSET + pattern_skip(channels, pattern_count)
}

/// Bytes between the end of the header and the first sample: the tag plus
/// every pattern block.
pub fn pattern_skip(channels: u8, pattern_count: u16) -> u64 {
    4 + ROWS_PER_PATTERN * BYTES_PER_NOTE * u64::from(channels) * u64::from(pattern_count)
}

/// Read the fixed 1080-byte header. Nothing is decoded from a partial read.
pub fn read_header<R: Read>(r: &mut R) -> Result<ModuleHeader, ModError> {
    let mut buf = [0u8; HEADER_LEN];
    read_full(r, &mut buf).map_err(ModError::ReadHeader)?;
    decode_header(&mut &buf[..])
        .map_err(|e| ModError::ReadHeader(ReadFailure::Io(e)))
}

fn decode_header(r: &mut dyn Read) -> io::Result<ModuleHeader> {
    let mut title = [0u8; TITLE_LEN];
    r.read_exact(&mut title)?;

    let mut instruments = Vec::with_capacity(NUM_INSTRUMENTS);
    for _i in 0..NUM_INSTRUMENTS {
        instruments.push(parse_instrument(r)?);
    }

    let order_length = r.read_u8()?;
    r.read_u8()?; // ignore, legacy restart
    let mut orders = [0u8; NUM_ORDERS];
    r.read_exact(&mut orders)?;

    Ok(ModuleHeader {
        title,
        instruments,
        order_length,
        orders,
    })
}

fn parse_instrument(r: &mut dyn Read) -> io::Result<Instrument> {
    let mut name = [0u8; NAME_LEN];
    r.read_exact(&mut name)?;
    let length_words = r.read_u16::<BigEndian>()?;
    let finetune = r.read_u8()?;
    let volume = r.read_u8()?;
    let loop_start_words = r.read_u16::<BigEndian>()?;
    let loop_length_words = r.read_u16::<BigEndian>()?;

    Ok(Instrument {
        name,
        length_words,
        finetune,
        volume,
        loop_start_words,
        loop_length_words,
    })
}

/// Fill `buf` completely, retrying on interruption.
///
/// Returns how many bytes were read before an error or end of file.
pub fn read_up_to<R: Read + ?Sized>(r: &mut R, buf: &mut [u8]) -> (usize, Option<ReadFailure>) {
    let mut filled = 0;
    while filled < buf.len() {
        match r.read(&mut buf[filled..]) {
            Ok(0) => return (filled, Some(ReadFailure::EndOfFile)),
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return (filled, Some(ReadFailure::Io(e))),
        }
    }
    (filled, None)
}

fn read_full<R: Read + ?Sized>(r: &mut R, buf: &mut [u8]) -> Result<(), ReadFailure> {
    match read_up_to(r, buf) {
        (_, Some(cause)) => Err(cause),
        (n, None) if n == buf.len() => Ok(()),
        _ => Err(ReadFailure::Unknown),
    }
}

// Seeking past the end never fails on its own, so check against the length.
fn seek_within<R: Seek>(r: &mut R, offset: u64) -> io::Result<()> {
    let len = r.seek(SeekFrom::End(0))?;
    if offset > len {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("offset {} is past end of file ({} bytes)", offset, len),
        ));
    }
    r.seek(SeekFrom::Start(offset))?;
    Ok(())
}

fn trim_nul(buf: &[u8]) -> &[u8] {
    match buf.iter().position(|&b| b == 0) {
        Some(end) => &buf[..end],
        None => buf,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::WriteBytesExt;
    use std::io::Cursor;

    fn tag(s: &[u8; 4]) -> Result<u8, ModError> {
        channels_for_tag(s)
    }

    #[test]
    fn classifies_four_channel_tags() {
        for t in &[b"M.K.", b"M!K!", b"M&K!", b"4CHN", b"FLT4", b"TDZ4"] {
            assert_eq!(tag(t).unwrap(), 4);
        }
    }

    #[test]
    fn classifies_digit_tags() {
        assert_eq!(tag(b"6CHN").unwrap(), 6);
        assert_eq!(tag(b"FLT8").unwrap(), 8);
        assert_eq!(tag(b"TDZ3").unwrap(), 3);
        assert_eq!(tag(b"16CN").unwrap(), 16);
        assert_eq!(tag(b"32CH").unwrap(), 32);
        assert_eq!(tag(b"10CH").unwrap(), 10);
    }

    #[test]
    fn classifies_eight_channel_tags() {
        for t in &[b"CD81", b"OKTA", b"OCTA"] {
            assert_eq!(tag(t).unwrap(), 8);
        }
    }

    #[test]
    fn rejects_unknown_tags() {
        for t in &[b"ABCD", b"XCHN", b"FLTx", b"1xCH", b"m.k.", b"\0\0\0\0"] {
            assert!(matches!(tag(t), Err(ModError::UnrecognizedTag(_))));
        }
    }

    #[test]
    fn rejects_zero_channels() {
        assert!(matches!(tag(b"00CH"), Err(ModError::InvalidChannelCount)));
        assert!(matches!(tag(b"0CHN"), Err(ModError::InvalidChannelCount)));
        assert!(matches!(tag(b"FLT0"), Err(ModError::InvalidChannelCount)));
    }

    #[test]
    fn sample_offset_for_single_pattern() {
        assert_eq!(sample_data_offset(4, 1), 1080 + 4 + 256 * 4);
        assert_eq!(sample_data_offset(8, 1), 1080 + 4 + 256 * 8);
        assert_eq!(pattern_skip(4, 3), 4 + 64 * 4 * 4 * 3);
    }

    fn header_bytes() -> Vec<u8> {
        let mut buf = vec![];
        buf.extend_from_slice(b"test title\0\0\0\0\0\0\0\0\0\0");
        for i in 0..NUM_INSTRUMENTS {
            let mut name = [0u8; NAME_LEN];
            name[0] = b'a' + i as u8;
            buf.extend_from_slice(&name);
            buf.write_u16::<BigEndian>(i as u16 * 0x101).unwrap();
            buf.push(i as u8);
            buf.push(64);
            buf.write_u16::<BigEndian>(2).unwrap();
            buf.write_u16::<BigEndian>(1).unwrap();
        }
        buf.push(3);
        buf.push(127);
        buf.extend_from_slice(&[0u8; NUM_ORDERS]);
        buf
    }

    #[test]
    fn decodes_header_fields() {
        let bytes = header_bytes();
        assert_eq!(bytes.len(), HEADER_LEN);

        let header = read_header(&mut Cursor::new(bytes)).unwrap();
        assert_eq!(header.title_bytes(), b"test title");
        assert_eq!(header.instruments.len(), NUM_INSTRUMENTS);
        assert_eq!(header.order_length, 3);

        let ins = &header.instruments[2];
        assert_eq!(ins.name_bytes(), b"c");
        assert_eq!(ins.length_words, 0x0202);
        assert_eq!(ins.byte_len(), 0x0404);
        assert_eq!(ins.finetune, 2);
        assert_eq!(ins.volume, 64);
        assert_eq!(ins.loop_start_words, 2);
        assert_eq!(ins.loop_length_words, 1);
    }

    #[test]
    fn big_endian_length_survives_write_and_read() {
        let mut bytes = header_bytes();
        let at = TITLE_LEN + NAME_LEN;
        for &value in &[0u16, 1, 0x00ff, 0x1234, 0xff00, u16::MAX] {
            (&mut bytes[at..at + 2])
                .write_u16::<BigEndian>(value)
                .unwrap();
            let header = read_header(&mut Cursor::new(&bytes)).unwrap();
            assert_eq!(header.instruments[0].length_words, value);
        }
    }

    #[test]
    fn short_header_is_end_of_file() {
        let bytes = header_bytes();
        let result = read_header(&mut Cursor::new(&bytes[..HEADER_LEN - 1]));
        assert!(matches!(
            result,
            Err(ModError::ReadHeader(ReadFailure::EndOfFile))
        ));
    }

    #[test]
    fn pattern_count_scans_whole_order_table() {
        let mut header = read_header(&mut Cursor::new(header_bytes())).unwrap();
        assert_eq!(header.pattern_count(), 1);

        header.orders[0] = 5;
        header.orders[1] = 2;
        assert_eq!(header.pattern_count(), 6);

        // past order_length, still counted
        header.orders[100] = 9;
        assert_eq!(header.pattern_count(), 10);

        header.orders[127] = 255;
        assert_eq!(header.pattern_count(), 256);
    }

    #[test]
    fn open_positions_reader_at_sample_data() {
        let mut bytes = header_bytes();
        bytes.extend_from_slice(b"M.K.");
        bytes.extend_from_slice(&[0u8; 1024]);
        bytes.extend_from_slice(&[0xaa, 0xbb]);

        let mut r = Cursor::new(bytes);
        let module = ProtrackerMod::open(&mut r).unwrap();
        assert_eq!(module.channels, 4);
        assert_eq!(module.pattern_count, 1);
        assert_eq!(module.sample_data_offset, 2108);
        assert_eq!(r.position(), 2108);
        assert_eq!(r.read_u8().unwrap(), 0xaa);
    }

    #[test]
    fn open_fails_when_file_ends_at_header() {
        let mut r = Cursor::new(header_bytes());
        assert!(matches!(
            ProtrackerMod::open(&mut r),
            Err(ModError::ReadMagic(ReadFailure::EndOfFile))
        ));
    }

    #[test]
    fn open_fails_without_pattern_data() {
        let mut bytes = header_bytes();
        bytes.extend_from_slice(b"6CHN");
        bytes.extend_from_slice(&[0u8; 100]);
        let mut r = Cursor::new(bytes);
        assert!(matches!(
            ProtrackerMod::open(&mut r),
            Err(ModError::SeekSampleData(_))
        ));
    }

    #[test]
    fn read_up_to_reports_partial_reads() {
        let mut buf = [0u8; 8];
        let (n, cause) = read_up_to(&mut &[1u8, 2, 3][..], &mut buf);
        assert_eq!(n, 3);
        assert!(matches!(cause, Some(ReadFailure::EndOfFile)));
        assert_eq!(&buf[..3], &[1, 2, 3]);
    }
}
