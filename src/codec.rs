//! DNS message codec for tokio_util
//!
//! This module holds the byte-level encoders for every message part and the
//! Decoder and Encoder implementations used by the framed UDP exchange.

use bytes::{BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::debug;

use crate::errors::DnsError;
use crate::message::Request;
use crate::protocol::{DomainName, Header, Query, HEADER_SIZE};

#[cfg(test)]
use crate::protocol::ResourceRecord;

/// Encode the header as ID | FLAGS | QDCOUNT | ANCOUNT | NSCOUNT | ARCOUNT
pub fn encode_header(header: &Header, dst: &mut BytesMut) {
    dst.reserve(HEADER_SIZE);

    dst.put_u16(header.id.value());
    dst.put_u16(header.flags.to_u16());
    dst.put_u16(header.query_count);
    dst.put_u16(header.answer_count);
    dst.put_u16(header.name_server_count);
    dst.put_u16(header.additional_record_count);
}

/// Encode a domain name as length-prefixed labels terminated by a zero byte.
/// Label lengths were checked when the name was built.
pub fn encode_domain_name(name: &DomainName, dst: &mut BytesMut) {
    dst.reserve(name.encoded_len());

    for label in name.labels() {
        dst.put_u8(label.len() as u8);
        dst.put_slice(label);
    }

    dst.put_u8(0);
}

/// Encode a question: name, QTYPE, QCLASS
pub fn encode_query(query: &Query, dst: &mut BytesMut) {
    encode_domain_name(&query.name, dst);
    dst.put_u16(query.record_type.into());
    dst.put_u16(query.record_class.into());
}

/// Encode a whole request: header, then every query in insertion order
pub fn encode_request(request: &Request, dst: &mut BytesMut) {
    encode_header(request.header(), dst);
    for query in request.queries() {
        encode_query(query, dst);
    }
}

/// Lowercase hex rendering of raw message bytes, for logs and dumps
pub fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Encode a resource record with its two-byte name reference, used to craft server replies in tests
#[cfg(test)]
pub(crate) fn encode_resource_record(record: &ResourceRecord, dst: &mut BytesMut) {
    dst.reserve(record.encoded_len());

    dst.put_u16(record.name.raw());
    dst.put_u16(record.record_type.into());
    dst.put_u16(record.record_class.into());
    dst.put_u32(record.ttl);
    dst.put_u16(record.rdlength());
    dst.put_slice(&record.rdata);
}

/// DNS message codec for use with tokio_util framed UDP sockets
#[derive(Debug, Default)]
pub struct DnsCodec;

impl DnsCodec {
    /// Create a new DNS codec instance
    pub fn new() -> Self {
        Self
    }
}

/// Decoding yields the raw datagram. Parsing is left to the exchange so that
/// datagrams from the wrong peer or with the wrong ID can be skipped before
/// their content is trusted.
impl Decoder for DnsCodec {
    type Item = Bytes;
    type Error = DnsError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        // UdpFramed hands over one whole datagram at a time and polls again
        // with the drained buffer once a frame was produced.
        if src.is_empty() {
            return Ok(None);
        }

        let datagram = src.split().freeze();
        debug!("DnsCodec::decode called with {} bytes", datagram.len());

        Ok(Some(datagram))
    }
}

impl<'a> Encoder<&'a Request> for DnsCodec {
    type Error = DnsError;

    fn encode(&mut self, item: &'a Request, dst: &mut BytesMut) -> Result<(), Self::Error> {
        debug!("DnsCodec::encode called for request ID {}", item.id());

        encode_request(item, dst);
        Ok(())
    }
}
