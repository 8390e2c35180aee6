const BYTES_PER_LINE: usize = 16;

/// Formats `data` as offset, hex bytes (split into two groups of eight)
/// and printable ASCII, one line per 16 bytes.
pub fn format_hexdump(data: &[u8]) -> String {
    let mut dump = String::with_capacity(data.len() / BYTES_PER_LINE * 76 + 76);

    for (line, chunk) in data.chunks(BYTES_PER_LINE).enumerate() {
        dump.push_str(&format!("0x{:04x}:  ", line * BYTES_PER_LINE));

        for column in 0..BYTES_PER_LINE {
            match chunk.get(column) {
                Some(byte) => dump.push_str(&format!("{byte:02x} ")),
                None => dump.push_str("   "),
            }
            if column == 7 {
                dump.push(' ');
            }
        }

        dump.push(' ');
        dump.extend(chunk.iter().map(|&byte| {
            if byte.is_ascii_graphic() {
                byte as char
            } else {
                '.'
            }
        }));
        dump.push('\n');
    }

    dump
}
