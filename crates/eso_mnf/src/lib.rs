//! This library handles reading **MNF** manifests and the **DAT** shards they index, as used by
//! *The Elder Scrolls Online*.
//!
//! # MNF Archive Format Documentation
//!
//! Game data is split between a manifest (`*.mnf`) and numbered shard files next to it
//! (`game0000.dat`, `game0001.dat`, ...). The manifest describes every stored file: which shard
//! holds it, where, how large it is and how it is compressed. File names live in a separate name
//! table that is itself stored as one of the manifest's entries.
//!
//! Two variants exist. The depot manifest (`depot/eso.mnf`) and the client manifest
//! (`game/client/game.mnf`) share the layout below but differ in where the name table is found
//! and in how entry payloads are wrapped, see [`ArchiveVariant`].
//!
//! ## File Structure
//!
//! | Offset (bytes) | Field                  | Description                                                |
//! |----------------|------------------------|------------------------------------------------------------|
//! | 0x0000         | Magic number           | 4 bytes: "MES2"                                            |
//! | 0x0004         | Version                | 2 bytes: Fixed value 3                                     |
//! | 0x0006         | Index Count            | 2 bytes: Number of 2 byte index values that follow         |
//! | 0x0008         | Index                  | Index Count × 2 bytes, skipped                             |
//! | ...            | Unknown                | 4 bytes: opaque                                            |
//! | ...            | Data Length            | 4 bytes: Length of the remaining data                      |
//! | ...            | Blocks                 | Optional type 0 blocks, then one type 3 table block        |
//!
//! Header fields and record contents are little endian. Block type tags, block counts and every
//! size word in front of a block payload are big endian.
//!
//! ### Blocks
//!
//! Every block starts with a 2 byte type tag.
//!
//! - **Type 0**: a 2 byte opaque word followed by two payloads, each prefixed with a 4 byte size.
//!   The payload format is not understood and the block is skipped.
//! - **Type 3**: a table block. A 4 byte opaque word, three 4 byte record counts, then three
//!   sub-streams. Each sub-stream is a 4 byte decompressed size, a 4 byte compressed size and a
//!   zlib stream.
//!
//! ### Manifest Table
//!
//! The three sub-streams of the table block are joined by position. The last record count gives
//! the number of entries.
//!
//! | Stream | Record size | Description                                                       |
//! |--------|-------------|-------------------------------------------------------------------|
//! | 0      | 4 (sparse)  | Windows whose fourth byte is 0x80 start a record, others are skipped |
//! | 1      | 8           | File index (the name table key) and an auxiliary flag             |
//! | 2      | 20          | Size, compressed size, hash, offset, shard number, compression    |
//!
//! In stream 2 the byte at 0x10 is the shard number and the byte at 0x11 the compression type.
//!
//! ### Name Table
//!
//! The name table payload starts with "ZOSFT", has three nested table blocks and ends with a
//! region of NUL terminated names, see [`names`].
//!
//! ### Payloads
//!
//! Entry data is stored in the shard at the recorded offset. Leading bytes decide the codec:
//! `8C 05`, `8C 06`, `8C 0A` and `8C 0C` mark the proprietary LZ family, handled by a pluggable
//! [`LzDecompressor`]; `78 9C` marks zlib. Anything else falls back to the declared compression
//! type. Client payloads carry two length-prefixed header fields in front of the content.
//!
//! ## Additional Information
//!
//! - **File Extensions**: `.mnf`, `.dat`
//! - **Endianness**: mixed, see above
//! - **Compression Methods**:
//!   - `0`: detect from the payload
//!   - `1`: Zlib
//!   - `2`: Snappy (not supported)
//!

pub mod block;
pub mod compression;
pub mod cursor;
pub mod error;
pub mod extract;
pub mod link;
pub mod manifest;
pub mod names;
pub mod read;
pub mod scan;
pub mod sniff;
#[cfg(feature = "serde")]
pub mod table;
pub mod types;
pub mod variant;

#[cfg(test)]
mod testing;

pub use compression::{CompressionType, LzDecompressor};
pub use extract::{ExtractedFile, ExtractionReport, ShardDirectory, ShardPool, ShardSource};
pub use link::ResolvedEntry;
pub use read::{ArchiveSession, SessionOptions};
pub use variant::ArchiveVariant;
