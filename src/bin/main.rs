use std::path::PathBuf;

use bgpstream_core::{
    BgpStream, Elem, FilterDimension, FormatKind, Record, RecordKindFilter, Resource,
    TransportKind,
};
use clap::{Parser, ValueEnum};
use itertools::Itertools;
use serde_json::json;

/// Accepts either a raw unix timestamp or an RFC 3339 datetime string, the
/// same two forms the teacher's `--start-ts`/`--end-ts` flags grew to accept
/// once filtering by human-readable date became common.
fn parse_ts(s: &str) -> Result<u32, String> {
    if let Ok(v) = s.parse::<u32>() {
        return Ok(v);
    }
    chrono::DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.timestamp() as u32)
        .map_err(|e| format!("'{}' is neither a unix timestamp nor RFC 3339: {}", s, e))
}

/// bgpstream-core is a CLI for parsing a single MRT/BMP data file, local or
/// remote, and printing its decoded BGP elems.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Opts {
    /// File path to an MRT/BMP file, local or remote.
    #[clap(name = "FILE")]
    file_path: String,

    /// Source format of FILE.
    #[clap(long, value_enum, default_value = "mrt")]
    format: FormatArg,

    /// Set the cache directory for caching remote files. Default behavior
    /// does not enable caching.
    #[clap(short, long)]
    cache_dir: Option<PathBuf>,

    /// Output as JSON objects.
    #[clap(long)]
    json: bool,

    /// Pretty-print JSON output.
    #[clap(long)]
    pretty: bool,

    /// Count elems instead of printing them.
    #[clap(short, long)]
    elems_count: bool,

    /// Count records instead of printing elems.
    #[clap(short, long)]
    records_count: bool,

    #[clap(flatten)]
    filters: Filters,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum FormatArg {
    Mrt,
    Bmp,
}

#[derive(Parser, Debug)]
struct Filters {
    /// Filter by peer ASN.
    #[clap(short = 'J', long)]
    peer_asn: Option<u32>,

    /// Filter by peer IP address(es), comma-separated.
    #[clap(short = 'j', long, value_delimiter = ',')]
    peer_ip: Vec<String>,

    /// Filter by exact network prefix.
    #[clap(short = 'p', long)]
    prefix: Option<String>,

    /// Filter by start time inclusive: unix timestamp or RFC 3339 datetime.
    #[clap(short = 't', long)]
    start_ts: Option<String>,

    /// Filter by end time inclusive: unix timestamp or RFC 3339 datetime.
    #[clap(short = 'T', long)]
    end_ts: Option<String>,

    /// Filter by AS path regex string.
    #[clap(short = 'a', long)]
    as_path: Option<String>,
}

fn main() {
    env_logger::init();
    let opts: Opts = Opts::parse();

    let format_kind = match opts.format {
        FormatArg::Mrt => FormatKind::Mrt,
        FormatArg::Bmp => FormatKind::Bmp,
    };
    let resource = Resource::new(
        TransportKind::File,
        format_kind,
        opts.file_path.clone(),
        0,
        // A bounded file resource reaches clean EOS at EOF. `FOREVER` is
        // reserved for live (e.g. Kafka) streams, where an `Ok(0)` read
        // means "no data yet" rather than "done" -- using it here would
        // make the format layer treat file-EOF as "not yet" and spin.
        0,
        "cli",
        "cli",
        RecordKindFilter::Update,
    );

    let mut stream = match opts.cache_dir {
        Some(dir) => BgpStream::with_cache_dir(dir),
        None => BgpStream::new(),
    };

    if let Err(e) = stream.add_resource_source(resource) {
        eprintln!("{}", e);
        std::process::exit(1);
    }

    if let Some(asn) = opts.filters.peer_asn {
        stream.add_filter(FilterDimension::PeerAsn(asn)).unwrap();
    }
    if !opts.filters.peer_ip.is_empty() {
        log::debug!(
            "filtering to peer ips: {}",
            opts.filters.peer_ip.iter().join(",")
        );
        for ip in opts.filters.peer_ip {
            stream.add_filter(FilterDimension::PeerIp(ip)).unwrap();
        }
    }
    if let Some(prefix) = opts.filters.prefix {
        stream
            .add_filter(FilterDimension::PrefixExact(prefix))
            .unwrap();
    }
    if let Some(pattern) = opts.filters.as_path {
        if let Err(e) = stream.add_filter(FilterDimension::AsPathRegex(pattern)) {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    }

    let start_ts = opts.filters.start_ts.map(|s| parse_ts(&s)).transpose().unwrap_or_else(|e| {
        eprintln!("{}", e);
        std::process::exit(1);
    });
    let end_ts = opts.filters.end_ts.map(|s| parse_ts(&s)).transpose().unwrap_or_else(|e| {
        eprintln!("{}", e);
        std::process::exit(1);
    });
    match (start_ts, end_ts) {
        (Some(start), Some(end)) => {
            if let Err(e) = stream.add_filter(FilterDimension::TimeInterval(start, end)) {
                eprintln!("{}", e);
                std::process::exit(1);
            }
        }
        (Some(start), None) => {
            stream
                .add_filter(FilterDimension::TimeInterval(start, u32::MAX))
                .unwrap();
        }
        (None, Some(end)) => {
            stream
                .add_filter(FilterDimension::TimeInterval(0, end))
                .unwrap();
        }
        (None, None) => {}
    }

    if let Err(e) = stream.start() {
        eprintln!("{}", e);
        std::process::exit(1);
    }

    let mut records_count = 0u64;
    let mut elems_count = 0u64;
    let mut record = Record::empty("", "");
    let print_elems = !opts.records_count;

    loop {
        match stream.get_next_record(&mut record) {
            Ok(1) => {}
            Ok(_) => break,
            Err(e) => {
                eprintln!("{}", e);
                std::process::exit(1);
            }
        }
        records_count += 1;

        let mut elem = Elem::new(
            bgpstream_core::ElemType::Announcement,
            "0.0.0.0".parse().unwrap(),
            bgpstream_core::Asn::new(0),
        );
        loop {
            match stream.get_next_elem(&mut elem) {
                Ok(1) => {}
                Ok(_) => break,
                Err(e) => {
                    eprintln!("{}", e);
                    std::process::exit(1);
                }
            }
            elems_count += 1;
            if print_elems && !opts.elems_count && !opts.records_count {
                print_elem(&elem, opts.json, opts.pretty);
            }
        }
    }

    if opts.elems_count {
        println!("total elems:   {}", elems_count);
    }
    if opts.records_count {
        println!("total records: {}", records_count);
    }
}

fn print_elem(elem: &Elem, as_json: bool, pretty: bool) {
    if as_json {
        let val = json!({
            "elem_type": format!("{:?}", elem.elem_type),
            "peer_ip": elem.peer_ip.to_string(),
            "peer_asn": elem.peer_asn.to_u32(),
            "prefix": elem.prefix.map(|p| p.to_string()),
            "next_hop": elem.next_hop.map(|a| a.to_string()),
            "as_path": elem.as_path.as_ref().map(|p| p.to_string()),
            "origin": elem.origin.map(|o| format!("{:?}", o)),
            "med": elem.med,
            "local_pref": elem.local_pref,
        });
        let out = if pretty {
            serde_json::to_string_pretty(&val).unwrap()
        } else {
            val.to_string()
        };
        println!("{}", out);
    } else {
        println!(
            "{:?}|{}|{}|{}",
            elem.elem_type,
            elem.peer_ip,
            elem.peer_asn,
            elem.prefix.map(|p| p.to_string()).unwrap_or_default()
        );
    }
}
