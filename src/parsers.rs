use bytes::Bytes;
use nom::{
    self,
    bytes::complete::take,
    number::complete::{be_u16, be_u32, be_u8},
    IResult,
};

use crate::errors::DnsError;
use crate::protocol::{
    DomainName, Flags, Header, Identifier, NameReference, Query, RecordClass, RecordType,
    ResourceRecord, HEADER_SIZE, QUERY_TRAILER_SIZE, RECORD_FIXED_SIZE,
};

pub fn parse_header(input: &[u8]) -> IResult<&[u8], Header> {
    let (input, id) = be_u16(input)?;
    // 1 bit qr, 4 bits opcode, 1 bit aa, 1 bit tc, 1 bit rd,
    // 1 bit ra, 3 bits z, 4 bits rcode
    let (input, flags) = be_u16(input)?;
    let (input, query_count) = be_u16(input)?;
    let (input, answer_count) = be_u16(input)?;
    let (input, name_server_count) = be_u16(input)?;
    let (input, additional_record_count) = be_u16(input)?;

    let header = Header {
        id: Identifier::from(id),
        flags: Flags::from_u16(flags),
        query_count,
        answer_count,
        name_server_count,
        additional_record_count,
    };

    Ok((input, header))
}

/// Parses length-prefixed labels up to and including the zero terminator.
/// Length bytes carrying the pointer tag are refused with `ErrorKind::Verify`.
fn parse_labels(input: &[u8]) -> IResult<&[u8], Vec<Bytes>> {
    let mut labels = Vec::new();
    let mut remaining = input;

    loop {
        let (i, length) = be_u8(remaining)?;

        match length {
            0 => return Ok((i, labels)),
            l if (l & 0b1100_0000) == 0b1100_0000 => {
                return Err(nom::Err::Failure(nom::error::Error::new(
                    remaining,
                    nom::error::ErrorKind::Verify,
                )));
            }
            l => {
                let (i, label_bytes) = take(l as usize)(i)?;
                labels.push(Bytes::copy_from_slice(label_bytes));
                remaining = i;
            }
        }
    }
}

fn parse_query(input: &[u8]) -> IResult<&[u8], (RecordType, RecordClass)> {
    let (input, record_type) = be_u16(input)?;
    let (input, record_class) = be_u16(input)?;

    Ok((
        input,
        (RecordType::from(record_type), RecordClass::from(record_class)),
    ))
}

type RecordFixed = (NameReference, RecordType, RecordClass, u32, u16);

fn parse_record_fixed(input: &[u8]) -> IResult<&[u8], RecordFixed> {
    let (input, name) = be_u16(input)?;
    let (input, record_type) = be_u16(input)?;
    let (input, record_class) = be_u16(input)?;
    let (input, ttl) = be_u32(input)?;
    let (input, rdlength) = be_u16(input)?;

    Ok((
        input,
        (
            NameReference::from(name),
            RecordType::from(record_type),
            RecordClass::from(record_class),
            ttl,
            rdlength,
        ),
    ))
}

/// Decode the 12-byte header at the start of `input`
pub fn decode_header(input: &[u8]) -> Result<Header, DnsError> {
    if input.len() < HEADER_SIZE {
        return Err(DnsError::ShortBuffer {
            needed: HEADER_SIZE,
            available: input.len(),
        });
    }

    let (_, header) = parse_header(input).map_err(|_| DnsError::ShortBuffer {
        needed: HEADER_SIZE,
        available: input.len(),
    })?;

    Ok(header)
}

/// Decode a domain name, returning it with the number of bytes consumed
pub fn decode_domain_name(input: &[u8]) -> Result<(DomainName, usize), DnsError> {
    match parse_labels(input) {
        Ok((remaining, labels)) => Ok((
            DomainName::from_labels(labels),
            input.len() - remaining.len(),
        )),
        Err(nom::Err::Failure(e)) if e.code == nom::error::ErrorKind::Verify => {
            Err(DnsError::UnsupportedPointer {
                offset: input.len() - e.input.len(),
            })
        }
        Err(_) => Err(DnsError::TruncatedName),
    }
}

/// Decode one question, returning it with the number of bytes consumed
pub fn decode_query(input: &[u8]) -> Result<(Query, usize), DnsError> {
    let (name, name_len) = decode_domain_name(input)?;
    let rest = &input[name_len..];

    let (_, (record_type, record_class)) = parse_query(rest).map_err(|_| DnsError::ShortBuffer {
        needed: QUERY_TRAILER_SIZE,
        available: rest.len(),
    })?;

    Ok((
        Query {
            name,
            record_type,
            record_class,
        },
        name_len + QUERY_TRAILER_SIZE,
    ))
}

/// Decode one resource record, returning it with the number of bytes consumed.
/// RDATA is copied out of `input` so the record outlives the datagram buffer.
pub fn decode_resource_record(input: &[u8]) -> Result<(ResourceRecord, usize), DnsError> {
    if input.len() < RECORD_FIXED_SIZE {
        return Err(DnsError::ShortBuffer {
            needed: RECORD_FIXED_SIZE,
            available: input.len(),
        });
    }

    let (rest, (name, record_type, record_class, ttl, rdlength)) = parse_record_fixed(input)
        .map_err(|_| DnsError::ShortBuffer {
            needed: RECORD_FIXED_SIZE,
            available: input.len(),
        })?;

    let rdata: IResult<&[u8], &[u8]> = take(rdlength as usize)(rest);
    let (_, rdata) = rdata.map_err(|_| DnsError::ShortBuffer {
        needed: rdlength as usize,
        available: rest.len(),
    })?;

    Ok((
        ResourceRecord {
            name,
            record_type,
            record_class,
            ttl,
            rdata: Bytes::copy_from_slice(rdata),
        },
        RECORD_FIXED_SIZE + rdlength as usize,
    ))
}
