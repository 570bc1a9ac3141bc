use thiserror::Error;

#[derive(Error, Debug)]
pub enum AtomError {
    #[error("Atom index {index} out of range (total atoms: {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Cutoff must be positive and finite, got {0}")]
    InvalidCutoff(f64),

    #[error("Unknown sort axis {0}; expected 0 (x), 1 (y), 2 (z) or 3 (radial)")]
    UnknownSortAxis(usize),

    #[error("Cell grid of {nx} x {ny} x {nz} cells is too large; increase the cutoff")]
    GridTooLarge { nx: usize, ny: usize, nz: usize },

    #[error("Simulation box bounds must be finite with lo <= hi")]
    InvalidBox,

    #[error("Linked-list cells have not been built")]
    MissingCellIndex,

    #[error("Linked-list cells were built for cutoff {built}, but {requested} was requested")]
    CutoffMismatch { built: f64, requested: f64 },

    #[error("Linked-list cells were built for {built} atoms, but the store holds {current}")]
    StaleCellIndex { built: usize, current: usize },

    #[error("Atom count mismatch: expected {expected}, found {found}")]
    SizeMismatch { expected: usize, found: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to parse line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Unsupported file format '{0}'")]
    UnsupportedFormat(String),

    #[error("Point field '{name}' has {found} values, expected {expected}")]
    FieldLength {
        name: String,
        expected: usize,
        found: usize,
    },
}

pub type Result<T> = std::result::Result<T, AtomError>;
