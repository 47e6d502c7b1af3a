use log::{info, warn};
use std::io::Read;
use std::path::Path;

use crate::error::{EncodeError, ReadFailure};
use crate::format::protracker::{read_up_to, Instrument, ProtrackerMod};

pub mod filename;
pub mod wav;

/// Reference playback rate for module samples (Amiga C-2, PAL).
pub const REFERENCE_RATE: u32 = 8363;

/// Sample rate per fine-tune index. Every entry is the reference rate.
pub static SAMPLE_RATES: [u32; 8] = [REFERENCE_RATE; 8];

pub struct OutputFormat {
    pub sample_rate: u32,
    pub sample_format: SampleFormat,
    pub channel_count: u16,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum SampleFormat {
    U8,
}

/// Opens one output file per sample.
pub trait Encoder {
    type Handle: EncoderHandle;

    fn open(&mut self, file_name: &str, format: &OutputFormat) -> Result<Self::Handle, EncodeError>;
}

pub trait EncoderHandle {
    /// Write raw PCM bytes, returning how many were written.
    fn write_raw(&mut self, data: &[u8]) -> Result<usize, EncodeError>;

    fn close(self) -> Result<(), EncodeError>;
}

#[derive(Debug, Default, Clone, Copy, Eq, PartialEq)]
pub struct ExtractSummary {
    pub written: usize,
    pub truncated: usize,
    pub empty: usize,
    pub failed: usize,
}

/// Flip the sign bit of every byte, converting between signed and unsigned
/// 8-bit PCM.
pub fn flip_sign(data: &mut [u8]) {
    for b in data.iter_mut() {
        *b ^= 0x80;
    }
}

pub fn sample_rate(finetune: u8) -> u32 {
    SAMPLE_RATES[usize::from(finetune & 0x7)]
}

/// Stream every instrument's payload from `r` into `encoder`.
///
/// `r` must be positioned at the first sample byte, as left by
/// [`ProtrackerMod::open`]. Failures here are per slot and only logged.
pub fn extract_samples<R, E>(
    r: &mut R,
    module: &ProtrackerMod,
    input_path: &Path,
    encoder: &mut E,
) -> ExtractSummary
where
    R: Read,
    E: Encoder,
{
    let path = input_path.to_string_lossy();
    let path_bytes = input_path.as_os_str().as_encoded_bytes();
    let mut summary = ExtractSummary::default();

    for (slot, ins) in module.header.instruments.iter().enumerate() {
        info!("  - {}", String::from_utf8_lossy(ins.name_bytes()));

        let len = ins.byte_len();
        if len == 0 {
            summary.empty += 1;
            continue;
        }

        let mut data = match read_sample(r, len) {
            SampleRead::Full(data) => data,
            SampleRead::Partial(data, cause) => {
                warn!("{}: could not read sample data: {}", path, cause);
                summary.truncated += 1;
                data
            }
            SampleRead::Nothing(cause) => {
                if let Some(ReadFailure::Io(e)) = cause {
                    warn!("{}: could not read sample data: {}", path, e);
                }
                summary.empty += 1;
                continue;
            }
            SampleRead::OutOfMemory => {
                warn!("{}: out of memory for {} bytes", path, len);
                summary.failed += 1;
                continue;
            }
        };
        flip_sign(&mut data);

        let file_name = filename::sample_file_name(
            &module.header.title,
            path_bytes,
            slot,
            &ins.name,
        );
        match write_sample(encoder, &file_name, ins, &data) {
            Ok(()) => summary.written += 1,
            Err(e) => {
                warn!("{}: {}", path, e);
                summary.failed += 1;
            }
        }
    }

    summary
}

enum SampleRead {
    Full(Vec<u8>),
    Partial(Vec<u8>, ReadFailure),
    Nothing(Option<ReadFailure>),
    OutOfMemory,
}

fn read_sample<R: Read>(r: &mut R, len: usize) -> SampleRead {
    let mut data = Vec::new();
    if data.try_reserve_exact(len).is_err() {
        return SampleRead::OutOfMemory;
    }
    data.resize(len, 0);

    match read_up_to(r, &mut data) {
        (0, cause) => SampleRead::Nothing(cause),
        (n, Some(cause)) => {
            data.truncate(n);
            SampleRead::Partial(data, cause)
        }
        (n, None) => {
            data.truncate(n);
            SampleRead::Full(data)
        }
    }
}

fn write_sample<E: Encoder>(
    encoder: &mut E,
    file_name: &str,
    ins: &Instrument,
    data: &[u8],
) -> Result<(), EncodeError> {
    let format = OutputFormat {
        sample_rate: sample_rate(ins.finetune),
        sample_format: SampleFormat::U8,
        channel_count: 1,
    };

    let mut handle = encoder.open(file_name, &format)?;
    let written = handle.write_raw(data);
    let closed = handle.close();

    match written? {
        n if n != data.len() => Err(EncodeError::ShortWrite {
            written: n,
            requested: data.len(),
        }),
        _ => closed,
    }
}
