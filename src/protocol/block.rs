/// CloudWatcher 15-byte block framing
use std::collections::HashMap;

/// Every response is a whole number of blocks of this size.
pub const BLOCK_SIZE: usize = 15;
/// First byte of every block.
pub const SYNC_BYTE: u8 = b'!';
/// Type byte of the control block that terminates most responses.
pub const HANDSHAKE_XON: u8 = 0x11;

const VALUE_START: usize = 2;
const VALUE_END: usize = 14;
const VALUE_WIDTH: usize = VALUE_END - VALUE_START;

/// Type code to trimmed value string, one entry per data block.
pub type ParsedMap = HashMap<char, String>;

/// A single decoded block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Handshake,
    Data { type_code: char, value: String },
    Invalid,
}

/// Decode one block.
///
/// Block layout:
/// - Byte 0: sync byte `!`
/// - Byte 1: type code, or XON (0x11) for the handshake block
/// - Bytes 2-13: value, ASCII, space padded
/// - Byte 14: filler, not part of the value
///
/// Anything with the wrong length or sync byte is `Block::Invalid`.
/// Non-ASCII bytes inside the value field are skipped.
pub fn decode_block(bytes: &[u8]) -> Block {
    if bytes.len() != BLOCK_SIZE || bytes[0] != SYNC_BYTE {
        return Block::Invalid;
    }

    if bytes[1] == HANDSHAKE_XON {
        return Block::Handshake;
    }

    let value: String = bytes[VALUE_START..VALUE_END]
        .iter()
        .filter(|b| b.is_ascii())
        .map(|&b| b as char)
        .collect();

    Block::Data {
        type_code: bytes[1] as char,
        value: value.trim().to_string(),
    }
}

/// Decode a full response into a type code map.
///
/// Bytes past the last whole block are ignored; callers check the length
/// before decoding. A repeated type code keeps the last value seen.
pub fn decode_response(bytes: &[u8]) -> ParsedMap {
    let mut parsed = ParsedMap::new();

    for chunk in bytes.chunks_exact(BLOCK_SIZE) {
        if let Block::Data { type_code, value } = decode_block(chunk) {
            parsed.insert(type_code, value);
        }
    }

    parsed
}

/// Encode a data block with a right-aligned value.
///
/// Values wider than the 12-byte field keep their first 12 bytes.
pub fn encode_block(type_code: char, value: &str) -> [u8; BLOCK_SIZE] {
    let mut block = [b' '; BLOCK_SIZE];
    block[0] = SYNC_BYTE;
    block[1] = type_code as u8;

    let bytes = value.as_bytes();
    let len = bytes.len().min(VALUE_WIDTH);
    let start = VALUE_END - len;
    block[start..VALUE_END].copy_from_slice(&bytes[..len]);

    block
}

/// Encode the handshake block that closes a response.
pub fn encode_handshake() -> [u8; BLOCK_SIZE] {
    let mut block = [b' '; BLOCK_SIZE];
    block[0] = SYNC_BYTE;
    block[1] = HANDSHAKE_XON;
    block
}
