// DNS message structures shared by the request and response paths

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use bytes::Bytes;

use crate::bitfield::BitField16;
use crate::errors::DnsError;

/// Fixed size of the message header on the wire
pub const HEADER_SIZE: usize = 12;

/// Size of the fixed part of a resource record: NAME-REF, TYPE, CLASS, TTL, RDLENGTH
pub const RECORD_FIXED_SIZE: usize = 12;

/// Size of QTYPE + QCLASS trailing a question name
pub const QUERY_TRAILER_SIZE: usize = 4;

/// Longest label a length byte may announce without colliding with the pointer tag (0xC0)
pub const MAX_LABEL_LEN: usize = 0xBF;

/// QR(1) OPCODE(4) AA(1) TC(1) RD(1) RA(1) Z(3) RCODE(4)
pub const FLAGS_LAYOUT: BitField16<8> = BitField16::new([1, 4, 1, 1, 1, 1, 3, 4]);

/// 16-bit message identifier, echoed back by the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Identifier(u16);

impl Identifier {
    /// Fresh identifier from a uniform random source
    pub fn random() -> Self {
        Self(fastrand::u16(..))
    }

    pub fn value(self) -> u16 {
        self.0
    }
}

impl From<u16> for Identifier {
    fn from(value: u16) -> Self {
        Self(value)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of query carried in the OPCODE field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationCode {
    StandardQuery,
    Reserved(u8),
}

impl From<u8> for OperationCode {
    fn from(value: u8) -> Self {
        match value & 0x0F {
            0 => OperationCode::StandardQuery,
            other => OperationCode::Reserved(other),
        }
    }
}

impl From<OperationCode> for u8 {
    fn from(code: OperationCode) -> Self {
        match code {
            OperationCode::StandardQuery => 0,
            OperationCode::Reserved(value) => value,
        }
    }
}

impl fmt::Display for OperationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationCode::StandardQuery => write!(f, "StandardQuery"),
            OperationCode::Reserved(value) => write!(f, "Reserved({})", value),
        }
    }
}

/// Status returned by the server in the RCODE field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseCode {
    NoError,
    FormatError,
    ServerFailure,
    NameError,
    NotImplemented,
    Refused,
    Unknown(u8),
}

impl From<u8> for ResponseCode {
    fn from(value: u8) -> Self {
        match value & 0x0F {
            0 => ResponseCode::NoError,
            1 => ResponseCode::FormatError,
            2 => ResponseCode::ServerFailure,
            3 => ResponseCode::NameError,
            4 => ResponseCode::NotImplemented,
            5 => ResponseCode::Refused,
            other => ResponseCode::Unknown(other),
        }
    }
}

impl From<ResponseCode> for u8 {
    fn from(code: ResponseCode) -> Self {
        match code {
            ResponseCode::NoError => 0,
            ResponseCode::FormatError => 1,
            ResponseCode::ServerFailure => 2,
            ResponseCode::NameError => 3,
            ResponseCode::NotImplemented => 4,
            ResponseCode::Refused => 5,
            ResponseCode::Unknown(value) => value,
        }
    }
}

impl fmt::Display for ResponseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseCode::NoError => write!(f, "NoError"),
            ResponseCode::FormatError => write!(f, "FormatError"),
            ResponseCode::ServerFailure => write!(f, "ServerFailure"),
            ResponseCode::NameError => write!(f, "NameError"),
            ResponseCode::NotImplemented => write!(f, "NotImplemented"),
            ResponseCode::Refused => write!(f, "Refused"),
            ResponseCode::Unknown(value) => write!(f, "Unknown({})", value),
        }
    }
}

/// The 16-bit flags word of the header.
///
/// `is_query` is stored the way callers think about it; on the wire the QR
/// bit is set for responses, so the value is inverted when packing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Flags {
    is_query: bool,
    operation_code: OperationCode,
    is_authoritative: bool,
    is_truncated: bool,
    is_recursion_desired: bool,
    is_recursion_available: bool,
    reserved: u8,
    response_code: ResponseCode,
}

impl Flags {
    /// Flags of an outgoing standard query asking for recursion
    pub fn request() -> Self {
        Self {
            is_query: true,
            operation_code: OperationCode::StandardQuery,
            is_authoritative: false,
            is_truncated: false,
            is_recursion_desired: true,
            is_recursion_available: false,
            reserved: 0,
            response_code: ResponseCode::NoError,
        }
    }

    pub fn from_u16(word: u16) -> Self {
        let [qr, opcode, aa, tc, rd, ra, z, rcode] = FLAGS_LAYOUT.unpack(word);

        Self {
            is_query: qr == 0,
            operation_code: OperationCode::from(opcode as u8),
            is_authoritative: aa == 1,
            is_truncated: tc == 1,
            is_recursion_desired: rd == 1,
            is_recursion_available: ra == 1,
            reserved: z as u8,
            response_code: ResponseCode::from(rcode as u8),
        }
    }

    pub fn to_u16(&self) -> u16 {
        FLAGS_LAYOUT.pack([
            u16::from(!self.is_query),
            u16::from(u8::from(self.operation_code)),
            u16::from(self.is_authoritative),
            u16::from(self.is_truncated),
            u16::from(self.is_recursion_desired),
            u16::from(self.is_recursion_available),
            u16::from(self.reserved),
            u16::from(u8::from(self.response_code)),
        ])
    }

    pub fn with_query(mut self, is_query: bool) -> Self {
        self.is_query = is_query;
        self
    }

    pub fn with_operation_code(mut self, operation_code: OperationCode) -> Self {
        self.operation_code = operation_code;
        self
    }

    pub fn with_authoritative(mut self, is_authoritative: bool) -> Self {
        self.is_authoritative = is_authoritative;
        self
    }

    pub fn with_truncated(mut self, is_truncated: bool) -> Self {
        self.is_truncated = is_truncated;
        self
    }

    pub fn with_recursion_desired(mut self, is_recursion_desired: bool) -> Self {
        self.is_recursion_desired = is_recursion_desired;
        self
    }

    pub fn with_recursion_available(mut self, is_recursion_available: bool) -> Self {
        self.is_recursion_available = is_recursion_available;
        self
    }

    pub fn with_reserved(mut self, reserved: u8) -> Self {
        self.reserved = reserved & 0x07;
        self
    }

    pub fn with_response_code(mut self, response_code: ResponseCode) -> Self {
        self.response_code = response_code;
        self
    }

    pub fn is_query(&self) -> bool {
        self.is_query
    }

    pub fn operation_code(&self) -> OperationCode {
        self.operation_code
    }

    pub fn is_authoritative(&self) -> bool {
        self.is_authoritative
    }

    pub fn is_truncated(&self) -> bool {
        self.is_truncated
    }

    pub fn is_recursion_desired(&self) -> bool {
        self.is_recursion_desired
    }

    pub fn is_recursion_available(&self) -> bool {
        self.is_recursion_available
    }

    pub fn reserved(&self) -> u8 {
        self.reserved
    }

    pub fn response_code(&self) -> ResponseCode {
        self.response_code
    }
}

impl fmt::Display for Flags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} opcode={} aa={} tc={} rd={} ra={} z={} rcode={}",
            if self.is_query { "Query" } else { "Response" },
            self.operation_code,
            self.is_authoritative,
            self.is_truncated,
            self.is_recursion_desired,
            self.is_recursion_available,
            self.reserved,
            self.response_code
        )
    }
}

/// The 12-byte message header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub id: Identifier,
    pub flags: Flags,
    pub query_count: u16,
    pub answer_count: u16,
    pub name_server_count: u16,
    pub additional_record_count: u16,
}

impl Header {
    /// Header of a fresh request: random ID, default request flags, zero counts
    pub fn request() -> Self {
        Self::new(Identifier::random(), Flags::request())
    }

    pub fn new(id: Identifier, flags: Flags) -> Self {
        Self {
            id,
            flags,
            query_count: 0,
            answer_count: 0,
            name_server_count: 0,
            additional_record_count: 0,
        }
    }

    /// Account for one more query, refusing to wrap past 65535
    pub fn add_query(&mut self) -> Result<(), DnsError> {
        self.query_count = self
            .query_count
            .checked_add(1)
            .ok_or(DnsError::CounterOverflow)?;
        Ok(())
    }
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "id={} [{}] qd={} an={} ns={} ar={}",
            self.id,
            self.flags,
            self.query_count,
            self.answer_count,
            self.name_server_count,
            self.additional_record_count
        )
    }
}

/// Record types (https://www.rfc-editor.org/rfc/rfc1035#section-3.2.2)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordType {
    A,
    NS,
    CNAME,
    MX,
    Unknown(u16),
}

impl From<u16> for RecordType {
    fn from(value: u16) -> Self {
        match value {
            1 => RecordType::A,
            2 => RecordType::NS,
            5 => RecordType::CNAME,
            15 => RecordType::MX,
            other => RecordType::Unknown(other),
        }
    }
}

impl From<RecordType> for u16 {
    fn from(record_type: RecordType) -> Self {
        match record_type {
            RecordType::A => 1,
            RecordType::NS => 2,
            RecordType::CNAME => 5,
            RecordType::MX => 15,
            RecordType::Unknown(value) => value,
        }
    }
}

impl FromStr for RecordType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "A" => Ok(RecordType::A),
            "NS" => Ok(RecordType::NS),
            "CNAME" => Ok(RecordType::CNAME),
            "MX" => Ok(RecordType::MX),
            _ => Err(format!(
                "Unsupported record type: '{}'. Expected one of A, NS, CNAME, MX",
                s
            )),
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordType::A => write!(f, "A"),
            RecordType::NS => write!(f, "NS"),
            RecordType::CNAME => write!(f, "CNAME"),
            RecordType::MX => write!(f, "MX"),
            RecordType::Unknown(value) => write!(f, "TYPE{}", value),
        }
    }
}

/// Record classes (https://www.rfc-editor.org/rfc/rfc1035#section-3.2.4)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordClass {
    INET,
    Unknown(u16),
}

impl From<u16> for RecordClass {
    fn from(value: u16) -> Self {
        match value {
            1 => RecordClass::INET,
            other => RecordClass::Unknown(other),
        }
    }
}

impl From<RecordClass> for u16 {
    fn from(record_class: RecordClass) -> Self {
        match record_class {
            RecordClass::INET => 1,
            RecordClass::Unknown(value) => value,
        }
    }
}

impl fmt::Display for RecordClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordClass::INET => write!(f, "IN"),
            RecordClass::Unknown(value) => write!(f, "CLASS{}", value),
        }
    }
}

/// A domain name as its sequence of labels, without the terminating empty label.
/// Labels are raw bytes; only `Display` renders them as text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainName {
    labels: Vec<Bytes>,
}

impl DomainName {
    /// Split a dotted name into labels. Empty parts (leading, trailing or doubled dots) are dropped.
    pub fn new(name: &str) -> Result<Self, DnsError> {
        let labels = name
            .split('.')
            .filter(|label| !label.is_empty())
            .map(|label| {
                if label.len() > MAX_LABEL_LEN {
                    return Err(DnsError::LabelTooLong {
                        label: label.to_string(),
                        len: label.len(),
                    });
                }
                Ok(Bytes::copy_from_slice(label.as_bytes()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { labels })
    }

    pub(crate) fn from_labels(labels: Vec<Bytes>) -> Self {
        Self { labels }
    }

    pub fn labels(&self) -> &[Bytes] {
        &self.labels
    }

    /// Bytes taken on the wire, including the zero terminator
    pub fn encoded_len(&self) -> usize {
        self.labels.iter().map(|label| 1 + label.len()).sum::<usize>() + 1
    }
}

impl fmt::Display for DomainName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.labels.is_empty() {
            return write!(f, ".");
        }
        for (i, label) in self.labels.iter().enumerate() {
            if i > 0 {
                write!(f, ".")?;
            }
            write!(f, "{}", String::from_utf8_lossy(label))?;
        }
        Ok(())
    }
}

/// A question: name, type and class
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub name: DomainName,
    pub record_type: RecordType,
    pub record_class: RecordClass,
}

impl Query {
    pub fn new(
        domain: &str,
        record_type: RecordType,
        record_class: RecordClass,
    ) -> Result<Self, DnsError> {
        Ok(Self {
            name: DomainName::new(domain)?,
            record_type,
            record_class,
        })
    }

    pub fn encoded_len(&self) -> usize {
        self.name.encoded_len() + QUERY_TRAILER_SIZE
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.name, self.record_class, self.record_type)
    }
}

/// The two-byte owner-name field of an answer.
///
/// Servers almost always compress the owner name into a pointer back to the
/// question. The value is kept as-is; the target name is never reconstructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NameReference(u16);

impl NameReference {
    pub fn raw(self) -> u16 {
        self.0
    }

    /// Top two bits set means the field is a compression pointer
    pub fn is_pointer(self) -> bool {
        self.0 & 0xC000 == 0xC000
    }

    /// Offset from the start of the message the pointer refers to
    pub fn offset(self) -> u16 {
        self.0 & 0x3FFF
    }
}

impl From<u16> for NameReference {
    fn from(value: u16) -> Self {
        Self(value)
    }
}

impl fmt::Display for NameReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_pointer() {
            write!(f, "ptr@{}", self.offset())
        } else {
            write!(f, "raw:{:#06x}", self.0)
        }
    }
}

/// A resource record from the answer section
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRecord {
    pub name: NameReference,
    pub record_type: RecordType,
    pub record_class: RecordClass,
    pub ttl: u32,
    pub rdata: Bytes,
}

impl ResourceRecord {
    pub fn rdlength(&self) -> u16 {
        self.rdata.len() as u16
    }

    pub fn encoded_len(&self) -> usize {
        RECORD_FIXED_SIZE + self.rdata.len()
    }

    /// The IPv4 address of an A record. Other record types yield `None`.
    pub fn ip(&self) -> Option<Ipv4Addr> {
        if self.record_type != RecordType::A {
            return None;
        }
        let octets: [u8; 4] = self.rdata.get(..4)?.try_into().ok()?;
        Some(Ipv4Addr::from(octets))
    }
}

impl fmt::Display for ResourceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} ttl={}s len={}",
            self.name,
            self.record_class,
            self.record_type,
            self.ttl,
            self.rdlength()
        )?;
        match self.ip() {
            Some(ip) => write!(f, " ip={}", ip),
            None => write!(f, " data={:?}", self.rdata.as_ref()),
        }
    }
}
