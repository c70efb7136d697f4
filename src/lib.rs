/*!
bgpstream-core provides time-ordered, filterable streaming access to BGP
routing data across the formats collectors actually publish: MRT archives
(RouteViews/RIPE RIS table dumps and updates), BMP route-monitoring feeds,
and RIPE RIS-Live's JSON websocket stream.

A single [`BgpStream`] merges any number of these resources into one
time-ordered sequence of [`Record`]s, each of which lazily unfolds into the
per-prefix [`Elem`] observations analysis code actually wants.

# Example

```no_run
use bgpstream_core::{BgpStream, Resource, TransportKind, FormatKind, RecordKindFilter};

let mut stream = BgpStream::new();
stream.add_resource_source(Resource::new(
    TransportKind::File,
    FormatKind::Mrt,
    "updates.20231001.0000.bz2".to_string(),
    1_696_118_400,
    900,
    "routeviews",
    "route-views2",
    RecordKindFilter::Update,
)).unwrap();
stream.start().unwrap();

let mut record = bgpstream_core::Record::empty("", "");
while stream.get_next_record(&mut record).unwrap() == 1 {
    let mut elem = bgpstream_core::Elem::new(
        bgpstream_core::ElemType::Announcement,
        "0.0.0.0".parse().unwrap(),
        bgpstream_core::Asn::new(0),
    );
    while stream.get_next_elem(&mut elem).unwrap() == 1 {
        println!("{:?}", elem);
    }
}
```

# Feature flags

- `parser` (default): the transport+format stack (file transport, MRT/BMP
  decoding). Disable for a models-only build.
- `local`: file-only parsing, dropping the HTTP half of `oneio`.
- `rislive`: RIPE RIS-Live JSON decoding.
- `kafka-transport`: Kafka-backed resources (OpenBMP-over-Kafka feeds).
- `cache-transport`: local disk caching of remote resources.
- `cli` (adds `clap`/`env_logger`): the bundled `bgpstream-core` binary.
- `serde`: `Serialize`/`Deserialize` on the model types.
*/

pub mod error;
pub mod filter;
#[cfg(feature = "parser")]
pub mod format;
#[cfg(feature = "parser")]
pub mod generator;
pub mod models;
#[cfg(feature = "parser")]
pub mod reader;
#[cfg(feature = "parser")]
pub mod reader_manager;
pub mod resource;
#[cfg(feature = "parser")]
pub mod stream;
#[cfg(feature = "parser")]
pub mod transport;

pub use error::{ParserError, ParserResult};
pub use filter::{CommunityMatch, FilterDimension, FilterManager};
pub use models::{
    Address, Afi, AsPath, AsPathSegment, Asn, AsnLength, Community, CommunitySet, Elem, ElemType,
    Origin, PeerState, Prefix, Record, RecordStatus, RecordType, Safi,
};
pub use resource::{FormatKind, RecordKindFilter, Resource, ResourceManager, TransportKind};
#[cfg(feature = "parser")]
pub use stream::BgpStream;
