use crc::Crc;

/// CRC-8, polynomial 0x07, used by the Anemoi wind sensor.
pub const ANEMOI_CRC: Crc<u8> = Crc::<u8>::new(&crc::CRC_8_SMBUS);

/// CRC-16, polynomial 0x8005, no reflection, used by the AR62xx radios.
pub const AR62XX_CRC: Crc<u16> = Crc::<u16>::new(&crc::CRC_16_UMTS);

/// XOR of all bytes.
pub fn xor_checksum(data: &[u8]) -> u8 {
    data.iter().fold(0, |acc, b| acc ^ b)
}

fn hex_digit(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'A'..=b'F' => Some(c - b'A' + 10),
        b'a'..=b'f' => Some(c - b'a' + 10),
        _ => None,
    }
}

/// Checks `$...*HH` with optional trailing CR/LF. The checksum is the XOR of
/// everything between `$` and `*`.
pub fn verify_nmea_checksum(line: &[u8]) -> bool {
    let line = trim_line_end(line);
    let Some(body) = line.strip_prefix(b"$") else {
        return false;
    };
    let Some(star) = body.iter().rposition(|&b| b == b'*') else {
        return false;
    };
    let (payload, tail) = body.split_at(star);
    let [_, hi, lo] = tail else {
        return false;
    };
    match (hex_digit(*hi), hex_digit(*lo)) {
        (Some(hi), Some(lo)) => xor_checksum(payload) == (hi << 4 | lo),
        _ => false,
    }
}

pub fn trim_line_end(line: &[u8]) -> &[u8] {
    let mut end = line.len();
    while end > 0 && matches!(line[end - 1], b'\r' | b'\n') {
        end -= 1;
    }
    &line[..end]
}

/// Appends `*HH\r\n` to a sentence starting with `$`.
pub fn append_nmea_checksum<const N: usize>(sentence: &mut heapless::Vec<u8, N>) -> Result<(), ()> {
    const HEX: &[u8; 16] = b"0123456789ABCDEF";
    let checksum = xor_checksum(sentence.get(1..).unwrap_or(&[]));
    sentence.extend_from_slice(&[
        b'*',
        HEX[(checksum >> 4) as usize],
        HEX[(checksum & 0x0F) as usize],
        b'\r',
        b'\n',
    ])
}
