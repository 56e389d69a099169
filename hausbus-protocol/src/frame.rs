//! Frame encoding and header validation
//!
//! Frame format:
//! - DESTINATION (1 byte): node, group or broadcast address
//! - SOURCE (1 byte): sender address
//! - HEADER CHECKSUM (1 byte): sum of the other five header bytes, mod 256
//! - PAYLOAD CHECKSUM (1 byte): reserved, always 0xFF, never verified
//! - LENGTH (2 bytes): payload length, big-endian
//! - PAYLOAD (LENGTH bytes)
//!
//! The payload checksum field carries no integrity information. Receivers
//! only know that the header is intact; anything that needs payload
//! integrity (EEPROM writes, for instance) must carry its own CRC inside the
//! payload.

use heapless::Vec;

/// Size of the fixed frame header
pub const HEADER_SIZE: usize = 6;

/// Largest frame (header + payload) the bus supports
///
/// Receivers keep a whole frame in their receive ring, so this is bounded by
/// the smallest ring on the bus.
pub const MAX_FRAME_SIZE: usize = 64;

/// Largest payload that fits into [`MAX_FRAME_SIZE`]
pub const MAX_PAYLOAD_SIZE: usize = MAX_FRAME_SIZE - HEADER_SIZE;

/// Value written into the reserved payload checksum field
pub const PAYLOAD_CHECKSUM_RESERVED: u8 = 0xFF;

/// A complete encoded frame, ready for the transmit engine or a queue
pub type FrameBuf = Vec<u8, MAX_FRAME_SIZE>;

/// Errors that can occur during frame parsing or encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// Payload exceeds the largest frame the bus supports
    PayloadTooLarge,
    /// Header checksum mismatch
    InvalidChecksum,
    /// Not enough bytes for a header or for the declared payload
    Incomplete,
    /// Buffer too small for encoding
    BufferTooSmall,
}

/// Parsed frame header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Header {
    /// Destination address
    pub destination: u8,
    /// Source address
    pub source: u8,
    /// Header checksum as found on the wire
    pub checksum: u8,
    /// Reserved payload checksum field
    pub payload_checksum: u8,
    /// Payload length in bytes
    pub length: u16,
}

impl Header {
    /// Build a header for an outgoing frame
    pub const fn new(destination: u8, source: u8, length: u16) -> Self {
        Self {
            destination,
            source,
            checksum: Self::compute_checksum(
                destination,
                source,
                PAYLOAD_CHECKSUM_RESERVED,
                length,
            ),
            payload_checksum: PAYLOAD_CHECKSUM_RESERVED,
            length,
        }
    }

    /// Sum of the non-checksum header fields, mod 256
    pub const fn compute_checksum(
        destination: u8,
        source: u8,
        payload_checksum: u8,
        length: u16,
    ) -> u8 {
        let [length_hi, length_lo] = length.to_be_bytes();
        destination
            .wrapping_add(source)
            .wrapping_add(payload_checksum)
            .wrapping_add(length_hi)
            .wrapping_add(length_lo)
    }

    /// Whether the stored checksum matches the other fields
    pub const fn is_valid(&self) -> bool {
        self.checksum
            == Self::compute_checksum(
                self.destination,
                self.source,
                self.payload_checksum,
                self.length,
            )
    }

    /// Total on-wire size of the frame this header announces
    pub const fn frame_len(&self) -> usize {
        HEADER_SIZE + self.length as usize
    }

    /// Wire representation
    pub const fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let [length_hi, length_lo] = self.length.to_be_bytes();
        [
            self.destination,
            self.source,
            self.checksum,
            self.payload_checksum,
            length_hi,
            length_lo,
        ]
    }

    /// Read the header fields without checking them
    ///
    /// Returns `None` if fewer than [`HEADER_SIZE`] bytes are given.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let bytes = bytes.get(..HEADER_SIZE)?;
        Some(Self {
            destination: bytes[0],
            source: bytes[1],
            checksum: bytes[2],
            payload_checksum: bytes[3],
            length: u16::from_be_bytes([bytes[4], bytes[5]]),
        })
    }
}

/// Check the header at the start of `bytes`
///
/// Recomputes the checksum over destination, source, payload checksum and
/// both length bytes and compares it with byte 2.
pub fn validate_header(bytes: &[u8]) -> Result<Header, FrameError> {
    let header = Header::from_bytes(bytes).ok_or(FrameError::Incomplete)?;
    if !header.is_valid() {
        return Err(FrameError::InvalidChecksum);
    }
    Ok(header)
}

/// Encode a frame into `buffer`
///
/// Returns the number of bytes written (header + payload).
pub fn encode_frame(
    destination: u8,
    source: u8,
    payload: &[u8],
    buffer: &mut [u8],
) -> Result<usize, FrameError> {
    if payload.len() > MAX_PAYLOAD_SIZE {
        return Err(FrameError::PayloadTooLarge);
    }

    let frame_len = HEADER_SIZE + payload.len();
    if buffer.len() < frame_len {
        return Err(FrameError::BufferTooSmall);
    }

    let header = Header::new(destination, source, payload.len() as u16);
    buffer[..HEADER_SIZE].copy_from_slice(&header.to_bytes());
    buffer[HEADER_SIZE..frame_len].copy_from_slice(payload);

    Ok(frame_len)
}

/// Encode a frame into a heapless Vec
pub fn encode_to_vec(destination: u8, source: u8, payload: &[u8]) -> Result<FrameBuf, FrameError> {
    let mut buffer = [0u8; MAX_FRAME_SIZE];
    let len = encode_frame(destination, source, payload, &mut buffer)?;
    let mut vec = Vec::new();
    vec.extend_from_slice(&buffer[..len])
        .map_err(|_| FrameError::BufferTooSmall)?;
    Ok(vec)
}

/// A frame viewed over a contiguous byte slice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Frame<'a> {
    /// Validated header
    pub header: Header,
    /// Payload bytes (exactly `header.length` of them)
    pub payload: &'a [u8],
}

impl<'a> Frame<'a> {
    /// Build an outgoing frame around a borrowed payload
    pub fn new(destination: u8, source: u8, payload: &'a [u8]) -> Result<Self, FrameError> {
        if payload.len() > MAX_PAYLOAD_SIZE {
            return Err(FrameError::PayloadTooLarge);
        }
        Ok(Self {
            header: Header::new(destination, source, payload.len() as u16),
            payload,
        })
    }

    /// Parse a frame from the start of `bytes`
    ///
    /// Trailing bytes beyond the declared length are ignored.
    pub fn parse(bytes: &'a [u8]) -> Result<Self, FrameError> {
        let header = validate_header(bytes)?;
        let payload = bytes
            .get(HEADER_SIZE..header.frame_len())
            .ok_or(FrameError::Incomplete)?;
        Ok(Self { header, payload })
    }

    /// Destination address
    pub fn destination(&self) -> u8 {
        self.header.destination
    }

    /// Source address
    pub fn source(&self) -> u8 {
        self.header.source
    }

    /// Total on-wire size
    pub fn len(&self) -> usize {
        self.header.frame_len()
    }

    /// Whether the payload is empty
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Encode this frame into a byte buffer
    pub fn encode(&self, buffer: &mut [u8]) -> Result<usize, FrameError> {
        encode_frame(
            self.header.destination,
            self.header.source,
            self.payload,
            buffer,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_ping() {
        let mut buffer = [0u8; 16];
        let len = encode_frame(0x01, 0x00, b"ping", &mut buffer).unwrap();

        assert_eq!(len, 10);
        // checksum = (1 + 0 + 0xFF + 0 + 4) mod 256 = 0x04
        assert_eq!(
            &buffer[..len],
            &[0x01, 0x00, 0x04, 0xFF, 0x00, 0x04, 0x70, 0x69, 0x6e, 0x67]
        );
    }

    #[test]
    fn test_parse_ping() {
        let bytes = [0x01, 0x00, 0x04, 0xFF, 0x00, 0x04, b'p', b'i', b'n', b'g'];
        let frame = Frame::parse(&bytes).unwrap();

        assert_eq!(frame.destination(), 0x01);
        assert_eq!(frame.source(), 0x00);
        assert_eq!(frame.header.checksum, 0x04);
        assert_eq!(frame.header.payload_checksum, PAYLOAD_CHECKSUM_RESERVED);
        assert_eq!(frame.header.length, 4);
        assert_eq!(frame.payload, b"ping");
        assert_eq!(frame.len(), 10);
    }

    #[test]
    fn test_encode_empty_payload() {
        let frame = encode_to_vec(50, 7, &[]).unwrap();
        assert_eq!(frame.len(), HEADER_SIZE);
        assert_eq!(frame[2], 50u8.wrapping_add(7).wrapping_add(0xFF));

        let parsed = Frame::parse(&frame).unwrap();
        assert!(parsed.is_empty());
    }

    #[test]
    fn test_validate_detects_each_bit_flip() {
        let encoded = encode_to_vec(0x03, 0x00, b"status").unwrap();

        for byte in 0..HEADER_SIZE {
            for bit in 0..8 {
                let mut corrupted = encoded.clone();
                corrupted[byte] ^= 1 << bit;
                assert_eq!(
                    validate_header(&corrupted),
                    Err(FrameError::InvalidChecksum),
                    "flip of bit {} in byte {} went unnoticed",
                    bit,
                    byte
                );
            }
        }
    }

    #[test]
    fn test_validate_short_input() {
        assert_eq!(validate_header(&[0x01, 0x00, 0x04]), Err(FrameError::Incomplete));
    }

    #[test]
    fn test_parse_truncated_payload() {
        let encoded = encode_to_vec(0x01, 0x00, b"ping").unwrap();
        assert_eq!(
            Frame::parse(&encoded[..encoded.len() - 1]),
            Err(FrameError::Incomplete)
        );
    }

    #[test]
    fn test_payload_too_large() {
        let large_payload = [0u8; MAX_PAYLOAD_SIZE + 1];
        let mut buffer = [0u8; 128];
        assert_eq!(
            encode_frame(1, 0, &large_payload, &mut buffer),
            Err(FrameError::PayloadTooLarge)
        );
        assert_eq!(
            Frame::new(1, 0, &large_payload),
            Err(FrameError::PayloadTooLarge)
        );
    }

    #[test]
    fn test_largest_payload_fits() {
        let payload = [0xA5u8; MAX_PAYLOAD_SIZE];
        let frame = encode_to_vec(1, 0, &payload).unwrap();
        assert_eq!(frame.len(), MAX_FRAME_SIZE);
    }

    #[test]
    fn test_buffer_too_small() {
        let mut buffer = [0u8; 8];
        assert_eq!(
            encode_frame(1, 0, b"ping", &mut buffer),
            Err(FrameError::BufferTooSmall)
        );
    }

    #[test]
    fn test_length_is_big_endian() {
        let header = Header::new(1, 2, 0x0102);
        let bytes = header.to_bytes();
        assert_eq!(bytes[4], 0x01);
        assert_eq!(bytes[5], 0x02);
        assert_eq!(Header::from_bytes(&bytes), Some(header));
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prop_header_roundtrip(
                destination in any::<u8>(),
                source in any::<u8>(),
                payload in proptest::collection::vec(any::<u8>(), 0..=MAX_PAYLOAD_SIZE),
            ) {
                let encoded = encode_to_vec(destination, source, &payload).unwrap();
                let header = validate_header(&encoded).unwrap();

                prop_assert_eq!(header.destination, destination);
                prop_assert_eq!(header.source, source);
                prop_assert_eq!(header.length as usize, payload.len());

                let frame = Frame::parse(&encoded).unwrap();
                prop_assert_eq!(frame.payload, payload.as_slice());
            }

            #[test]
            fn prop_single_bit_flip_rejected(
                destination in any::<u8>(),
                source in any::<u8>(),
                len in 0..=MAX_PAYLOAD_SIZE,
                byte in 0..HEADER_SIZE,
                bit in 0u8..8,
            ) {
                let payload = [0x5Au8; MAX_PAYLOAD_SIZE];
                let mut encoded = encode_to_vec(destination, source, &payload[..len]).unwrap();
                encoded[byte] ^= 1 << bit;

                prop_assert_eq!(validate_header(&encoded), Err(FrameError::InvalidChecksum));
            }
        }
    }
}
