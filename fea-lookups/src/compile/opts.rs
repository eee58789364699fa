//! Options used during compilation

use super::lookups::LayoutTable;

const DEFAULT_MAX_SEQUENCES: usize = 4096;
const DEFAULT_SEQUENCE_WARNING_THRESHOLD: usize = 256;

/// Options for configuring compilation behaviour.
#[derive(Clone, Debug)]
pub struct Opts {
    pub(crate) max_sequences: usize,
    pub(crate) sequence_warning_threshold: usize,
    pub(crate) compile_gsub: bool,
    pub(crate) compile_gpos: bool,
}

impl Opts {
    /// Create a new empty set of options
    pub fn new() -> Self {
        Self::default()
    }

    /// Specify the maximum number of sequences a single rule may expand to.
    ///
    /// Rules that would expand to more fail with a sequence explosion error.
    /// The count is computed before anything is expanded. Default is 4096.
    pub fn max_sequences(mut self, max: usize) -> Self {
        self.max_sequences = max;
        self
    }

    /// Specify the expansion size above which a warning is logged.
    ///
    /// Default is 256.
    pub fn sequence_warning_threshold(mut self, threshold: usize) -> Self {
        self.sequence_warning_threshold = threshold;
        self
    }

    /// Specify whether or not we should compile GPOS features. Default is `true`.
    pub fn compile_gpos(mut self, flag: bool) -> Self {
        self.compile_gpos = flag;
        self
    }

    /// Specify whether or not we should compile GSUB features. Default is `true`.
    pub fn compile_gsub(mut self, flag: bool) -> Self {
        self.compile_gsub = flag;
        self
    }

    pub(crate) fn compiles(&self, table: LayoutTable) -> bool {
        match table {
            LayoutTable::Gsub => self.compile_gsub,
            LayoutTable::Gpos => self.compile_gpos,
        }
    }
}

impl Default for Opts {
    fn default() -> Self {
        Self {
            max_sequences: DEFAULT_MAX_SEQUENCES,
            sequence_warning_threshold: DEFAULT_SEQUENCE_WARNING_THRESHOLD,
            compile_gsub: true,
            compile_gpos: true,
        }
    }
}
