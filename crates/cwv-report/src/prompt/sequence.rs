//! Step numbering for one prompt build.

/// Monotonic step counter owned by a single `assemble` call.
///
/// Templates draw a number per data step so a plan reads "Step 1 … Step N"
/// with no gaps. Each assembly starts from a fresh sequence.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StepSequence {
    issued: u32,
}

impl StepSequence {
    /// A sequence whose first step is 1.
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the next step number.
    pub fn advance(&mut self) -> u32 {
        self.issued += 1;
        self.issued
    }

    /// Number of steps claimed so far.
    pub fn issued(&self) -> u32 {
        self.issued
    }
}
