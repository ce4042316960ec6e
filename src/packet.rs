use crate::error::RconError;

// SERVERDATA_AUTH
pub const SERVERDATA_AUTH: i32 = 3;
// SERVERDATA_AUTH_RESPONSE, shares its value with SERVERDATA_EXECCOMMAND
pub const SERVERDATA_AUTH_RESPONSE: i32 = 2;
// SERVERDATA_EXECCOMMAND
pub const SERVERDATA_EXECCOMMAND: i32 = 2;
// SERVERDATA_RESPONSE_VALUE
pub const SERVERDATA_RESPONSE_VALUE: i32 = 0;

/// Types of packets the client sends. Incoming packets keep their type as a
/// plain integer, since `2` means either "auth response" or "exec command"
/// depending on where in the session we are.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketType {
    Auth,
    Exec,
}

impl PacketType {
    pub fn value(&self) -> i32 {
        match self {
            PacketType::Auth => SERVERDATA_AUTH,
            PacketType::Exec => SERVERDATA_EXECCOMMAND,
        }
    }
}

/// One length-prefixed message on the wire. The body is stored without its
/// null terminator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    id: i32,
    packet_type: i32,
    body: Vec<u8>,
}

impl Packet {
    /// ID and type, the part of the payload in front of the body.
    pub const HEADER_SIZE: usize = 8;
    /// Size of a packet with an empty body.
    pub const BASE_PACKET_SIZE: i32 = 10;

    pub fn new(id: i32, packet_type: PacketType, body: &str) -> Self {
        Packet {
            id,
            packet_type: packet_type.value(),
            body: body.as_bytes().to_vec(),
        }
    }

    /// Parses the payload of a packet, i.e. everything after the size prefix.
    /// Trailing null bytes are not part of the body.
    pub fn unpack(payload: &[u8]) -> Result<Self, RconError> {
        if payload.len() < Self::HEADER_SIZE {
            return Err(RconError::MalformedResponse("packet shorter than its header"));
        }

        let id = read_i32(&payload[0..4]);
        let packet_type = read_i32(&payload[4..8]);
        let body = &payload[Self::HEADER_SIZE..];
        let end = body.iter().rposition(|b| *b != 0).map_or(0, |pos| pos + 1);

        Ok(Packet {
            id,
            packet_type,
            body: body[..end].to_vec(),
        })
    }

    // Counts everything after the size prefix: 4 (id) + 4 (type) + body + 2
    // terminators.
    pub fn size(&self) -> i32 {
        self.body.len() as i32 + Self::BASE_PACKET_SIZE
    }

    pub fn id(&self) -> i32 {
        self.id
    }

    pub fn packet_type(&self) -> i32 {
        self.packet_type
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Body as text. Invalid UTF-8 is replaced rather than rejected, servers
    /// are not careful about what they put in player names.
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn pack(&self) -> Vec<u8> {
        // Size, ID, Type, Body, Terminator
        let mut payload = Vec::<u8>::with_capacity(self.size() as usize + 4);
        payload.extend_from_slice(&self.size().to_le_bytes());
        payload.extend_from_slice(&self.id.to_le_bytes());
        payload.extend_from_slice(&self.packet_type.to_le_bytes());
        payload.extend_from_slice(&self.body);
        // null terminate the body, then null terminate the entire packet. one
        // terminator is not enough, the server will misread the next packet.
        payload.extend_from_slice(&[0u8, 0u8]);
        payload
    }
}

/// Reads a little-endian i32 from a slice of exactly four bytes.
pub(crate) fn read_i32(bytes: &[u8]) -> i32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&bytes[..4]);
    i32::from_le_bytes(buf)
}
