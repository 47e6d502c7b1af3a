use super::*;

/// One line per non-empty instrument slot, for diagnostics.
pub fn info_instruments(header: &ModuleHeader) -> String {
    let instrument_strs: Vec<_> = header
        .instruments
        .iter()
        .enumerate()
        .filter(|(_idx, ins)| ins.length_words > 0)
        .map(|(idx, ins)| {
            format!(
                "{:>02} {:>22}, ft: {:>2}, len: {:>05x}, vol: {:>02x}, roff: {:>05x}, rlen: {:>05x}",
                idx + 1,
                String::from_utf8_lossy(ins.name_bytes()),
                ins.finetune & 0x0f,
                ins.byte_len(),
                ins.volume,
                usize::from(ins.loop_start_words) * 2,
                usize::from(ins.loop_length_words) * 2
            )
        })
        .collect();
    instrument_strs.join("\n")
}

/// Title line printed before a module's instrument names.
pub fn info_title(path: &str, header: &ModuleHeader) -> String {
    format!("> {}: {}", path, String::from_utf8_lossy(header.title_bytes()))
}
