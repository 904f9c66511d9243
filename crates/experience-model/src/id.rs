//! Store-assigned record ids.
//!
//! An id is `{sequence:010}-{nonce}`. The sequence grows in append order
//! and gives the feed its tiebreak; the nonce keeps ids unique when two
//! writers that cannot see each other pick the same sequence.

/// Build a record id from an append sequence and a random nonce.
pub fn record_id(sequence: u64, nonce: &str) -> String {
    format!("{sequence:010}-{nonce}")
}

/// Append sequence carried by an id.
///
/// Plain numeric ids count as a bare sequence. Ids from other clients that
/// carry no sequence return `None`.
pub fn append_sequence(id: &str) -> Option<u64> {
    let sequence = id.split_once('-').map_or(id, |(sequence, _)| sequence);
    if sequence.is_empty() || !sequence.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    sequence.parse().ok()
}
