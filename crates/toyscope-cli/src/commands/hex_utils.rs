//! Address and hex dump helpers shared by the commands.

use toyscope_core::parse_address;

/// A memory range given on the command line as `ADDR:LEN`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub address: u64,
    pub len: usize,
}

/// Parse a length: decimal, or hex with a `0x` prefix.
fn parse_len(s: &str) -> Result<usize, String> {
    let s = s.trim();
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => usize::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| format!("invalid length {:?}: {}", s, e))
}

/// Parse `ADDR:LEN`.
pub fn parse_region(s: &str) -> Result<Region, String> {
    let (address, len) = s
        .split_once(':')
        .ok_or_else(|| format!("expected ADDR:LEN, got {:?}", s))?;
    let region = Region {
        address: parse_address(address).map_err(|e| e.to_string())?,
        len: parse_len(len)?,
    };
    if region.len == 0 {
        return Err(format!("region {:?} is empty", s));
    }
    Ok(region)
}

/// Format bytes as 16-byte rows: address, hex bytes, printable ASCII.
pub fn format_hex_dump(address: u64, bytes: &[u8]) -> Vec<String> {
    let bytes_per_line = 16;

    bytes
        .chunks(bytes_per_line)
        .enumerate()
        .map(|(i, chunk)| {
            let addr = address + (i * bytes_per_line) as u64;
            let hex_part = chunk
                .iter()
                .map(|b| format!("{:02X}", b))
                .collect::<Vec<_>>()
                .join(" ");
            let ascii_part: String = chunk
                .iter()
                .map(|&b| if (0x20..0x7F).contains(&b) { b as char } else { '.' })
                .collect();
            format!("{:016X}  {:47}  {}", addr, hex_part, ascii_part)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_region() {
        assert_eq!(
            parse_region("0x10:32"),
            Ok(Region {
                address: 0x10,
                len: 32
            })
        );
        assert_eq!(parse_region("10:0x20").map(|r| r.len), Ok(0x20));
        assert!(parse_region("0x10").is_err());
        assert!(parse_region("0x10:0").is_err());
        assert!(parse_region("0x10:-1").is_err());
        assert_eq!(
            parse_region("zz:4").unwrap_err(),
            "Invalid address: \"zz\" is not a hex address: invalid digit found in string"
        );
    }

    #[test]
    fn test_format_hex_dump() {
        let mut bytes = b"Hello, toyscript".to_vec();
        bytes.extend_from_slice(&[0x00, 0xFF]);

        let lines = format_hex_dump(0x1000, &bytes);
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[0],
            "0000000000001000  48 65 6C 6C 6F 2C 20 74 6F 79 73 63 72 69 70 74  Hello, toyscript"
        );
        assert!(lines[1].starts_with("0000000000001010  00 FF "));
        assert!(lines[1].ends_with("  .."));
    }
}
