use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use super::{Encoder, EncoderHandle, OutputFormat, SampleFormat};
use crate::error::EncodeError;

/// Writes each sample as a RIFF/WAVE file inside `out_dir`.
pub struct WavEncoder {
    out_dir: PathBuf,
}

pub struct WavHandle {
    writer: hound::WavWriter<BufWriter<File>>,
    path: PathBuf,
    written: u64,
}

impl WavEncoder {
    pub fn new<P: Into<PathBuf>>(out_dir: P) -> WavEncoder {
        WavEncoder {
            out_dir: out_dir.into(),
        }
    }
}

impl Encoder for WavEncoder {
    type Handle = WavHandle;

    fn open(&mut self, file_name: &str, format: &OutputFormat) -> Result<WavHandle, EncodeError> {
        let bits_per_sample = match format.sample_format {
            SampleFormat::U8 => 8,
        };
        let spec = hound::WavSpec {
            channels: format.channel_count,
            sample_rate: format.sample_rate,
            bits_per_sample,
            sample_format: hound::SampleFormat::Int,
        };
        let path = self.out_dir.join(file_name);
        let writer = hound::WavWriter::create(&path, spec).map_err(EncodeError::Open)?;
        Ok(WavHandle {
            writer,
            path,
            written: 0,
        })
    }
}

impl EncoderHandle for WavHandle {
    fn write_raw(&mut self, data: &[u8]) -> Result<usize, EncodeError> {
        // hound takes signed 8-bit samples and stores them offset-binary,
        // so re-sign each byte to get it into the file unchanged.
        for &b in data {
            self.writer
                .write_sample((b ^ 0x80) as i8)
                .map_err(EncodeError::Write)?;
            self.written += 1;
        }
        Ok(data.len())
    }

    fn close(self) -> Result<(), EncodeError> {
        self.writer.finalize().map_err(EncodeError::Close)?;
        if self.written % 2 == 1 {
            pad_data_chunk(&self.path).map_err(EncodeError::Pad)?;
        }
        Ok(())
    }
}

/// RIFF chunks are word aligned. hound leaves an odd-sized trailing data
/// chunk unpadded, so append the pad byte and grow the RIFF size to match.
fn pad_data_chunk(path: &Path) -> io::Result<()> {
    let mut f = OpenOptions::new().read(true).write(true).open(path)?;
    f.seek(SeekFrom::End(0))?;
    f.write_u8(0)?;

    f.seek(SeekFrom::Start(4))?;
    let riff_size = f.read_u32::<LittleEndian>()?;
    f.seek(SeekFrom::Start(4))?;
    f.write_u32::<LittleEndian>(riff_size + 1)?;
    Ok(())
}
