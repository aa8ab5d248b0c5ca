pub fn hex_dump(bytes: &[u8], start_offset: u64) -> String {
    // Simple hexdump
    let mut out = String::new();
    for (i, chunk) in bytes.chunks(16).enumerate() {
        let offs = start_offset + (i as u64) * 16;
        let hexs: String = chunk.iter().map(|b| format!("{:02x} ", b)).collect();
        let ascii: String = chunk.iter().map(|b| {
            let c = *b;
            if (32..=126).contains(&c) { c as char } else { '.' }
        }).collect();
        out.push_str(&format!("{:08x}  {:<48}  |{}|\n", offs, hexs, ascii));
    }
    out
}

/// Format an unsigned Q16.16 fixed-point value, e.g. `320.0000`.
pub fn format_fixed_16_16(v: u32) -> String {
    format!("{:.4}", v as f64 / 65536.0)
}

/// Format a signed Q16.16 fixed-point value.
pub fn format_signed_fixed_16_16(v: i32) -> String {
    format!("{:.4}", v as f64 / 65536.0)
}

/// Format a signed Q8.8 fixed-point value, e.g. `-0.5000`.
pub fn format_signed_fixed_8_8(v: i16) -> String {
    format!("{:.4}", v as f32 / 256.0)
}

/// Unpack an ISO 639-2/T language triplet: three 5-bit values, each offset
/// by 0x60. All-zero means "und".
pub fn language_code(triplet: &[u64]) -> String {
    if triplet.len() != 3 || triplet.iter().all(|&c| c == 0) {
        return "und".to_string();
    }
    triplet
        .iter()
        .map(|&c| ((c as u8 & 0x1F) + 0x60) as char)
        .collect()
}
