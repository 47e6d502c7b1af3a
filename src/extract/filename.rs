//! Output file naming.
//!
//! Names look like `<base>-<slot>-<instrument>.wav`. Every byte copied from
//! the module or the input path goes through [`sanitize_into`], so the result
//! is plain printable ASCII with no path or shell metacharacters.

use std::path::is_separator;

/// Bytes that may not appear in a file name on common filesystems.
const FORBIDDEN: &[u8] = b"<>:\"/\\|?*";

fn safe_byte(b: u8) -> u8 {
    if b < 0x20 || b >= 0x7f || FORBIDDEN.contains(&b) {
        b'_'
    } else {
        b
    }
}

/// Append `field` to `out`, stopping at the first zero byte.
pub fn sanitize_into(out: &mut String, field: &[u8]) {
    out.extend(
        field
            .iter()
            .take_while(|&&b| b != 0)
            .map(|&b| char::from(safe_byte(b))),
    );
}

pub fn sanitize(field: &[u8]) -> String {
    let mut out = String::with_capacity(field.len());
    sanitize_into(&mut out, field);
    out
}

/// The last component of `path`, or all of it when there is no separator.
///
/// Works on the raw path bytes so that every non-ASCII byte is sanitized
/// on its own.
pub fn file_base(path: &[u8]) -> &[u8] {
    match path.iter().rposition(|&b| is_separator(char::from(b))) {
        Some(pos) => &path[pos + 1..],
        None => path,
    }
}

/// Name for the sample in 0-based `slot`.
///
/// Falls back to the input file's base name when the title is blank.
pub fn sample_file_name(title: &[u8], input_path: &[u8], slot: usize, name: &[u8]) -> String {
    let mut out = String::new();
    match title.first() {
        Some(&b) if b != 0 => sanitize_into(&mut out, title),
        _ => sanitize_into(&mut out, file_base(input_path)),
    }
    out.push_str(&format!("-{}-", slot + 1));
    sanitize_into(&mut out, name);
    out.push_str(".wav");
    out
}
