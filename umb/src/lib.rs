//! UMB - Unified Markov Binary model files
//!
//! This library reads and writes probabilistic transition systems (DTMCs,
//! MDPs, CTMCs, Markov automata and stochastic games) in the UMB interchange
//! format: a tar archive holding a JSON index and little-endian binary arrays
//! in compressed-sparse-row form, optionally xz or zstd compressed.
//!
//! ## Architecture
//!
//! UMB keeps format definitions apart from I/O:
//!
//! - **umb-core**: Index schema, entry names, bit-packed records and validation (no I/O)
//! - **umb**: Archive container, streaming array codec, writer and reader
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use umb::{NumericType, TimeNotion, UmbReader, UmbWriter};
//!
//! fn example() -> umb::Result<()> {
//!     // A two-state chain that moves to state 1 and stays there
//!     let mut writer = UmbWriter::new();
//!     writer
//!         .index_mut()
//!         .set_time(TimeNotion::Discrete)
//!         .set_num_players(0)
//!         .set_num_states(2)
//!         .set_num_initial_states(1)
//!         .set_num_choices(2)
//!         .set_num_choice_actions(0)
//!         .set_num_branches(2)
//!         .set_num_branch_actions(0)
//!         .set_branch_probability_type(NumericType::Double);
//!     writer.add_state_choice_offsets(vec![0, 1, 2])?;
//!     writer.add_choice_branch_offsets(vec![0, 1, 2])?;
//!     writer.add_branch_targets(vec![1, 1])?;
//!     writer.add_branch_probabilities(vec![1.0, 1.0])?;
//!     writer.add_initial_state_indices(vec![0])?;
//!     writer.export("chain.umb")?;
//!
//!     // Stream it back
//!     let reader = UmbReader::open("chain.umb")?;
//!     reader.extract_branch_probabilities(|p| println!("{p}"))?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Streaming**: Arrays are pulled from iterators on write and pushed to closures on read
//! - **Size checks**: Every entry's length is checked against the index before decoding
//! - **Annotations**: Atomic propositions, rewards and variables with alias lookup
//! - **State valuations**: Bit-packed per-state variable records
//! - **Compression**: xz (default) and zstd behind the `xz` and `zstd` cargo features

// Re-export core abstractions and format definitions
pub use umb_core::{
    // Index
    Annotation, FileData, ModelData, TransitionSystem, UmbIndex, ValuationDescription,
    ValuationItem,
    // Format definitions
    CompressionFormat, ElementKind, Entity, Interchange, NumericType, TimeNotion, ValueType,
    VariableType,
    // Bit packing
    BitString, Layout, LayoutItem, VariableValue,
    // Error handling
    Result, UmbError,
};
pub use umb_core::{dirs, files, groups};

pub mod archive;
pub mod arrays;
pub mod config;
pub mod reader;
pub mod text;
pub mod writer;

pub use archive::{ArchiveReader, ArchiveWriter};
pub use config::ExportConfig;
pub use reader::UmbReader;
pub use text::format_double;
pub use writer::UmbWriter;
