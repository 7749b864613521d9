//! Format constants and archive entry names for the UMB format

use super::enums::CompressionFormat;

/// Major format version written by this implementation
pub const FORMAT_VERSION: u32 = 1;

/// Format revision written by this implementation
pub const FORMAT_REVISION: u32 = 0;

/// Compression formats a conformant writer may produce
pub const ALLOWED_COMPRESSION: &[CompressionFormat] = &[CompressionFormat::Xz];

/// Compression used when none is requested explicitly
pub const DEFAULT_COMPRESSION: CompressionFormat = CompressionFormat::Xz;

/// Number of booleans packed into one 64-bit word
pub const BOOLS_PER_WORD: u64 = 64;

/// Metadata entry
pub const INDEX_FILE: &str = "index.json";

/// Core transition system arrays
pub mod files {
    pub const STATE_CHOICE_OFFSETS: &str = "state-to-choice.bin";
    pub const CHOICE_BRANCH_OFFSETS: &str = "choice-to-branch.bin";
    pub const BRANCH_TARGETS: &str = "branch-to-target.bin";
    pub const BRANCH_PROBABILITIES: &str = "branch-probabilities.bin";
    pub const EXIT_RATES: &str = "exit-rates.bin";
    pub const INITIAL_STATES: &str = "initial-states.bin";
    pub const CHOICE_ACTIONS: &str = "choice-to-choice-action.bin";
    pub const BRANCH_ACTIONS: &str = "branch-to-branch-action.bin";
    pub const CHOICE_ACTION_STRING_OFFSETS: &str = "choice-action-to-string.bin";
    pub const CHOICE_ACTION_STRINGS: &str = "choice-action-strings.bin";
    pub const BRANCH_ACTION_STRING_OFFSETS: &str = "branch-action-to-string.bin";
    pub const BRANCH_ACTION_STRINGS: &str = "branch-action-strings.bin";
}

/// Directory and file names for annotations and valuations
pub mod dirs {
    pub const ANNOTATIONS: &str = "annotations";
    pub const VALUATIONS: &str = "valuations";
    pub const VALUES_FILE: &str = "values.bin";
    pub const VALUATIONS_FILE: &str = "valuations.bin";
}

/// Built-in annotation groups
pub mod groups {
    /// Boolean atomic propositions
    pub const APS: &str = "aps";
    /// Double-valued rewards
    pub const REWARDS: &str = "rewards";
    /// Per-state variable values
    pub const VARIABLES: &str = "variables";
}
