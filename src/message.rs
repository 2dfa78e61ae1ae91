//! Request building and response parsing.
//!
//! A [`Request`] owns its header and queries and is consumed by a single
//! exchange. A [`Response`] only comes out of [`Response::parse`] and is
//! read-only afterwards.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use bytes::{Bytes, BytesMut};
use tracing::debug;

use crate::codec::{encode_request, to_hex};
use crate::errors::DnsError;
use crate::parsers::{decode_header, decode_query, decode_resource_record};
use crate::protocol::{
    Header, Identifier, Query, RecordClass, RecordType, ResourceRecord, ResponseCode, HEADER_SIZE,
};

/// An outgoing query addressed to one DNS server
#[derive(Debug, Clone)]
pub struct Request {
    destination: SocketAddr,
    header: Header,
    queries: Vec<Query>,
}

impl Request {
    /// Request with a fresh random ID and the default query flags
    pub fn new(destination: &str, port: i64) -> Result<Self, DnsError> {
        Self::with_header(Header::request(), destination, port)
    }

    /// Request around a caller-built header.
    /// `destination` must be an IP literal and `port` must fit in 16 bits.
    pub fn with_header(header: Header, destination: &str, port: i64) -> Result<Self, DnsError> {
        let ip: IpAddr = destination
            .parse()
            .map_err(|_| DnsError::InvalidAddress(destination.to_string()))?;
        let port = u16::try_from(port).map_err(|_| DnsError::InvalidPort(port))?;

        Ok(Self {
            destination: SocketAddr::new(ip, port),
            header,
            queries: Vec::new(),
        })
    }

    /// Append a question and bump the header's query count
    pub fn add_query(
        &mut self,
        domain: &str,
        record_type: RecordType,
        record_class: RecordClass,
    ) -> Result<(), DnsError> {
        let query = Query::new(domain, record_type, record_class)?;
        self.header.add_query()?;
        self.queries.push(query);
        Ok(())
    }

    pub fn destination(&self) -> SocketAddr {
        self.destination
    }

    pub fn id(&self) -> Identifier {
        self.header.id
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn queries(&self) -> &[Query] {
        &self.queries
    }

    pub fn domains(&self) -> Vec<String> {
        self.queries.iter().map(|q| q.name.to_string()).collect()
    }

    /// Header bytes followed by every query in insertion order
    pub fn to_bytes(&self) -> Bytes {
        let capacity =
            HEADER_SIZE + self.queries.iter().map(Query::encoded_len).sum::<usize>();
        let mut buf = BytesMut::with_capacity(capacity);
        encode_request(self, &mut buf);
        buf.freeze()
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Address: {}", self.destination)?;
        writeln!(f, "Header: {}", self.header)?;
        for query in &self.queries {
            writeln!(f, "Query: {}", query)?;
        }
        Ok(())
    }
}

/// A parsed server reply
#[derive(Debug, Clone)]
pub struct Response {
    raw: Bytes,
    header: Header,
    queries: Vec<Query>,
    answers: Vec<ResourceRecord>,
}

impl Response {
    /// Parse a whole datagram: header, then the question and answer sections.
    ///
    /// The authority and additional sections are counted in the header but
    /// left unparsed. The first error aborts the parse.
    pub fn parse(raw: Bytes) -> Result<Self, DnsError> {
        let header = decode_header(&raw)?;

        if header.flags.is_truncated() {
            return Err(DnsError::Truncated);
        }
        let response_code = header.flags.response_code();
        if response_code != ResponseCode::NoError {
            return Err(DnsError::ServerError(response_code));
        }

        let mut cursor = HEADER_SIZE;

        let mut queries = Vec::with_capacity(header.query_count as usize);
        for _ in 0..header.query_count {
            let (query, consumed) = decode_query(&raw[cursor..])?;
            cursor = advance(cursor, consumed, raw.len())?;
            queries.push(query);
        }

        let mut answers = Vec::with_capacity(header.answer_count as usize);
        for _ in 0..header.answer_count {
            let (answer, consumed) = decode_resource_record(&raw[cursor..])?;
            cursor = advance(cursor, consumed, raw.len())?;
            answers.push(answer);
        }

        debug!(
            packet_id = header.id.value(),
            question_count = header.query_count,
            answer_count = header.answer_count,
            authority_count = header.name_server_count,
            additional_count = header.additional_record_count,
            unparsed_bytes = raw.len() - cursor,
            "DNS response parsed successfully"
        );

        Ok(Self {
            raw,
            header,
            queries,
            answers,
        })
    }

    pub fn raw(&self) -> &Bytes {
        &self.raw
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn id(&self) -> Identifier {
        self.header.id
    }

    pub fn queries(&self) -> &[Query] {
        &self.queries
    }

    pub fn answers(&self) -> &[ResourceRecord] {
        &self.answers
    }

    /// IPv4 addresses of the A records in the answer section
    pub fn ips(&self) -> Vec<Ipv4Addr> {
        self.answers.iter().filter_map(ResourceRecord::ip).collect()
    }

    pub fn domains(&self) -> Vec<String> {
        self.queries.iter().map(|q| q.name.to_string()).collect()
    }
}

/// Move the cursor past a decoded section entry
fn advance(cursor: usize, consumed: usize, len: usize) -> Result<usize, DnsError> {
    let available = len - cursor;
    if consumed > available {
        return Err(DnsError::Overrun {
            needed: consumed,
            available,
        });
    }
    Ok(cursor + consumed)
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Raw: {}", to_hex(&self.raw))?;
        writeln!(f, "Header: {}", self.header)?;
        for query in &self.queries {
            writeln!(f, "Query: {}", query)?;
        }
        for answer in &self.answers {
            writeln!(f, "Answer: {}", answer)?;
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::codec::{encode_header, encode_query, encode_resource_record};
    use crate::protocol::{Flags, NameReference};

    /// Server-side reply to `request` carrying one A record per address
    pub(crate) fn reply_to(request: &Request, flags: Flags, ips: &[Ipv4Addr]) -> Bytes {
        let header = Header {
            id: request.id(),
            flags,
            query_count: request.header().query_count,
            answer_count: ips.len() as u16,
            name_server_count: 0,
            additional_record_count: 0,
        };

        let mut buf = BytesMut::new();
        encode_header(&header, &mut buf);
        for query in request.queries() {
            encode_query(query, &mut buf);
        }
        for ip in ips {
            let record = ResourceRecord {
                name: NameReference::from(0xC00C),
                record_type: RecordType::A,
                record_class: RecordClass::INET,
                ttl: 60,
                rdata: Bytes::copy_from_slice(&ip.octets()),
            };
            encode_resource_record(&record, &mut buf);
        }

        buf.freeze()
    }

    fn response_flags() -> Flags {
        Flags::request()
            .with_query(false)
            .with_recursion_available(true)
    }

    #[test]
    fn test_new_request_defaults() {
        let request = Request::new("1.1.1.1", 53).unwrap();
        assert_eq!(
            request.destination(),
            "1.1.1.1:53".parse::<SocketAddr>().unwrap()
        );
        assert!(request.header().flags.is_query());
        assert!(request.header().flags.is_recursion_desired());
        assert_eq!(request.header().query_count, 0);
        assert_eq!(request.header().answer_count, 0);
        assert!(request.queries().is_empty());
    }

    #[test]
    fn test_new_request_accepts_ipv6() {
        let request = Request::new("2606:4700:4700::1111", 53).unwrap();
        assert!(request.destination().is_ipv6());
    }

    #[test]
    fn test_new_request_invalid_address() {
        assert!(matches!(
            Request::new("dns.google", 53),
            Err(DnsError::InvalidAddress(addr)) if addr == "dns.google"
        ));
    }

    #[test]
    fn test_new_request_invalid_port() {
        assert!(matches!(
            Request::new("8.8.8.8", -1),
            Err(DnsError::InvalidPort(-1))
        ));
        assert!(matches!(
            Request::new("8.8.8.8", 65536),
            Err(DnsError::InvalidPort(65536))
        ));
        assert!(Request::new("8.8.8.8", 0).is_ok());
    }

    #[test]
    fn test_add_query_increments_count() {
        let mut request = Request::new("8.8.8.8", 53).unwrap();
        request
            .add_query("example.com", RecordType::A, RecordClass::INET)
            .unwrap();
        request
            .add_query("example.com", RecordType::MX, RecordClass::INET)
            .unwrap();

        assert_eq!(request.header().query_count, 2);
        assert_eq!(request.domains(), ["example.com", "example.com"]);
    }

    #[test]
    fn test_add_query_rejects_long_label_without_counting() {
        let mut request = Request::new("8.8.8.8", 53).unwrap();
        let domain = format!("{}.com", "x".repeat(200));

        assert!(matches!(
            request.add_query(&domain, RecordType::A, RecordClass::INET),
            Err(DnsError::LabelTooLong { .. })
        ));
        assert_eq!(request.header().query_count, 0);
        assert!(request.queries().is_empty());
    }

    #[test]
    fn test_request_to_bytes_gokhanuysal_net() {
        let header = Header::new(Identifier::from(0xABCD), Flags::request());
        let mut request = Request::with_header(header, "1.1.1.1", 53).unwrap();
        request
            .add_query("gokhanuysal.net", RecordType::A, RecordClass::INET)
            .unwrap();

        let mut expected = vec![
            0xAB, 0xCD, // ID
            0x01, 0x00, // RD
            0x00, 0x01, // QDCOUNT
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        ];
        expected.push(0x0B);
        expected.extend_from_slice(b"gokhanuysal");
        expected.push(0x03);
        expected.extend_from_slice(b"net");
        expected.extend_from_slice(&[0x00, 0x00, 0x01, 0x00, 0x01]);

        assert_eq!(request.to_bytes().as_ref(), &expected[..]);
    }

    #[test]
    fn test_parse_response_with_answers() {
        let mut request = Request::new("8.8.8.8", 53).unwrap();
        request
            .add_query("google.com", RecordType::A, RecordClass::INET)
            .unwrap();
        let ips = [Ipv4Addr::new(8, 8, 8, 8), Ipv4Addr::new(8, 8, 4, 4)];
        let bytes = reply_to(&request, response_flags(), &ips);

        let response = Response::parse(bytes.clone()).unwrap();
        assert_eq!(response.id(), request.id());
        assert!(!response.header().flags.is_query());
        assert_eq!(response.domains(), ["google.com"]);
        assert_eq!(response.answers().len(), 2);
        assert_eq!(response.ips(), ips);
        assert_eq!(response.raw(), &bytes);
    }

    #[test]
    fn test_parse_response_two_queries_reaches_answer_section() {
        let mut request = Request::new("8.8.8.8", 53).unwrap();
        request
            .add_query("a.example", RecordType::A, RecordClass::INET)
            .unwrap();
        request
            .add_query("b.example", RecordType::NS, RecordClass::INET)
            .unwrap();
        let bytes = reply_to(&request, response_flags(), &[Ipv4Addr::new(10, 0, 0, 1)]);

        let response = Response::parse(bytes).unwrap();
        assert_eq!(response.queries().len(), 2);
        assert_eq!(response.queries()[1].record_type, RecordType::NS);
        // The single answer right after both queries decoded cleanly
        assert_eq!(response.ips(), [Ipv4Addr::new(10, 0, 0, 1)]);
    }

    #[test]
    fn test_parse_response_ignores_authority_and_additional() {
        let mut request = Request::new("8.8.8.8", 53).unwrap();
        request
            .add_query("example.org", RecordType::A, RecordClass::INET)
            .unwrap();
        let mut bytes = BytesMut::from(
            reply_to(&request, response_flags(), &[Ipv4Addr::new(1, 2, 3, 4)]).as_ref(),
        );
        // NSCOUNT = 1 with trailing bytes that are never looked at
        bytes[9] = 1;
        bytes.extend_from_slice(&[0xde, 0xad, 0xbe, 0xef]);

        let response = Response::parse(bytes.freeze()).unwrap();
        assert_eq!(response.header().name_server_count, 1);
        assert_eq!(response.answers().len(), 1);
    }

    #[test]
    fn test_parse_response_truncated() {
        let request = Request::new("8.8.8.8", 53).unwrap();
        let bytes = reply_to(&request, response_flags().with_truncated(true), &[]);

        assert!(matches!(Response::parse(bytes), Err(DnsError::Truncated)));
    }

    #[test]
    fn test_parse_response_truncated_checked_before_sections() {
        // TC set and QDCOUNT claims a query that is not there
        let bytes = Bytes::from_static(&[0, 1, 0x82, 0x00, 0, 1, 0, 0, 0, 0, 0, 0]);
        assert!(matches!(Response::parse(bytes), Err(DnsError::Truncated)));
    }

    #[test]
    fn test_parse_response_server_error() {
        let request = Request::new("8.8.8.8", 53).unwrap();
        let flags = response_flags().with_response_code(ResponseCode::NameError);
        let bytes = reply_to(&request, flags, &[]);

        let err = Response::parse(bytes).unwrap_err();
        assert!(matches!(
            err,
            DnsError::ServerError(ResponseCode::NameError)
        ));
        assert_eq!(err.to_string(), "Server responded with status: NameError");
    }

    #[test]
    fn test_parse_response_short_header() {
        let bytes = Bytes::from_static(&[0, 1, 0x81, 0x80, 0, 0, 0, 0, 0, 0, 0]);
        assert!(matches!(
            Response::parse(bytes),
            Err(DnsError::ShortBuffer { needed: 12, .. })
        ));
    }

    #[test]
    fn test_parse_response_missing_query() {
        // QDCOUNT = 1 but the datagram ends after the header
        let bytes = Bytes::from_static(&[0, 1, 0x81, 0x80, 0, 1, 0, 0, 0, 0, 0, 0]);
        assert!(matches!(
            Response::parse(bytes),
            Err(DnsError::TruncatedName)
        ));
    }

    #[test]
    fn test_parse_response_missing_answer() {
        let mut request = Request::new("8.8.8.8", 53).unwrap();
        request
            .add_query("example.org", RecordType::A, RecordClass::INET)
            .unwrap();
        let mut bytes = BytesMut::from(reply_to(&request, response_flags(), &[]).as_ref());
        // ANCOUNT = 1 with no record behind it
        bytes[7] = 1;

        assert!(matches!(
            Response::parse(bytes.freeze()),
            Err(DnsError::ShortBuffer {
                needed: 12,
                available: 0
            })
        ));
    }

    #[test]
    fn test_advance_overrun() {
        assert_eq!(advance(12, 4, 20).unwrap(), 16);
        assert!(matches!(
            advance(12, 9, 20),
            Err(DnsError::Overrun {
                needed: 9,
                available: 8
            })
        ));
    }

    #[test]
    fn test_response_display() {
        let mut request = Request::new("8.8.8.8", 53).unwrap();
        request
            .add_query("google.com", RecordType::A, RecordClass::INET)
            .unwrap();
        let bytes = reply_to(&request, response_flags(), &[Ipv4Addr::new(8, 8, 8, 8)]);
        let rendered = Response::parse(bytes).unwrap().to_string();

        assert!(rendered.starts_with("Raw: "));
        assert!(rendered.contains("Query: google.com IN A"));
        assert!(rendered.contains("Answer: ptr@12 IN A ttl=60s len=4 ip=8.8.8.8"));
    }
}
