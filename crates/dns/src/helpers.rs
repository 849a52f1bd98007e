/// Extracts the transaction ID from a DNS message.
pub fn extract_transaction_id(data: &[u8]) -> Option<u16> {
    if data.len() < 2 {
        return None;
    }
    Some(u16::from_be_bytes([data[0], data[1]]))
}

/// Checks the TC bit of a raw DNS message.
///
/// Returns `None` if the buffer is too short to contain a header.
pub fn is_truncated(data: &[u8]) -> Option<bool> {
    if data.len() < 12 {
        return None;
    }
    Some(data[2] & 0x02 != 0)
}
