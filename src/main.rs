mod cli;

use anyhow::Context;
use dnsq::codec::to_hex;
use dnsq::{RecordClass, Request};
use tracing::{debug, info, Level};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = cli::Args::parse_args();

    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt()
        .with_max_level(if args.verbose { Level::DEBUG } else { Level::INFO })
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    let mut request = Request::new(&args.server.to_string(), i64::from(args.port))
        .context("Failed to build DNS request")?;
    request
        .add_query(&args.domain, args.record_type, RecordClass::INET)
        .with_context(|| format!("Failed to add query for {}", args.domain))?;

    debug!(
        target: "dnsq::request_details",
        packet_id = request.id().value(),
        destination = %request.destination(),
        bytes = %to_hex(&request.to_bytes()),
        "DNS request built"
    );
    info!(
        "Querying {} for {} {}",
        request.destination(),
        args.record_type,
        args.domain
    );

    let response = request
        .exchange(args.timeout())
        .await
        .context("DNS exchange failed")?;

    let header = response.header();
    debug!(
        target: "dnsq::response_details",
        packet_id = header.id.value(),
        authoritative = header.flags.is_authoritative(),
        recursion_available = header.flags.is_recursion_available(),
        response_code = %header.flags.response_code(),
        question_count = header.query_count,
        answer_count = header.answer_count,
        authority_count = header.name_server_count,
        additional_count = header.additional_record_count,
        "DNS response header parsed successfully"
    );

    println!("{}", response);

    let ips = response.ips();
    if ips.is_empty() {
        info!("No A records in the answer section for {}", args.domain);
    }
    for ip in ips {
        println!("{} -> {}", args.domain, ip);
    }

    Ok(())
}
