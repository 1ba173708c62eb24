//! Composite Key Module
//!
//! Builds and parses the flat binary keys every collection is projected onto.
//!
//! ## Responsibilities
//! - Encode an ordered list of byte segments into one store key
//! - Decode a store key back into its segments
//! - Prefix tests used to bound every range scan
//! - Fixed-width big-endian numeric segments (byte order == numeric order)
//!
//! ## Key Format
//! ```text
//! ┌──────────┬──────────────┬──────────┬──────────────┬─────┐
//! │ Len (4)  │  Segment 0   │ Len (4)  │  Segment 1   │ ... │
//! └──────────┴──────────────┴──────────┴──────────────┴─────┘
//! ```
//!
//! Every segment is length-tagged, so a segment byte can never be mistaken
//! for a boundary. A key built from `[s1..sk]` is a byte prefix of every key
//! built from `[s1..sk, ...]`, and of no other well-formed key.
//!
//! ## Collection Layout
//! ```text
//! metadata:   [name] [ns?]
//! list item:  [name] [ns?] [version] [index u64]
//! set member: [name] [ns?] [version] [member]
//! map entry:  [name] [ns?] [version] [key]
//! zset:       [name] [ns?] [version] "members" [member]          → score
//!             [name] [ns?] [version] "scores"  [score] [member]  → ()
//! bitmap:     [name] [ns?] [version] [fragment u64]              → roaring blob
//! ```

mod builder;
mod encoding;

pub use builder::{append_to_key, decode, has_prefix, prefix_successor, strip_prefix, KeyBuilder};
pub use encoding::{
    decode_i64, decode_sortable_i64, decode_u16, decode_u32, decode_u64, encode_sortable_i64,
};

/// Size of the length tag in front of every segment
pub const SEGMENT_HEADER_SIZE: usize = 4;
