use std::fmt::Write;

/// Space-separated upper-case hex, e.g. `12 AB`.
pub fn hex_bytes(buffer: &[u8]) -> String {
    let mut str = String::with_capacity(buffer.len() * 3);
    for (i, byte) in buffer.iter().enumerate() {
        if i > 0 {
            str.push(' ');
        }
        let _ = write!(str, "{:02X}", byte);
    }
    str
}

/// Classic 16-bytes-per-line dump of `buffer[start..end]`, addresses relative
/// to the buffer.
pub fn hexdump(buffer: &[u8], start: u32, end: u32) -> String {
    let end = (end as usize).min(buffer.len());
    let mut str = String::new();
    let mut addr = start as usize;
    while addr < end {
        let line_end = (addr + 16).min(end);
        let row = &buffer[addr..line_end];
        let chars: String = row
            .iter()
            .map(|&byte| {
                let c = byte as char;
                if c.is_ascii_graphic() || c == ' ' {
                    c
                } else {
                    '.'
                }
            })
            .collect();

        let _ = writeln!(str, "{:06x}: {:<47}  {}", addr, hex_bytes(row), chars);
        addr = line_end;
    }

    str
}
