/// Represents the result of a single allocation attempt.
///
/// This type models the outcome of [`Allocator::try_allocate_once`]:
///
/// - [`AllocStatus::Committed`] indicates the conditional write landed and
///   `value` is now durably issued.
/// - [`AllocStatus::Conflict`] means another caller advanced the sequence
///   between our read and our write. Nothing was written; re-read and try
///   again.
///
/// This allows callers to drive their own retry loop when the built-in
/// [`Allocator::allocate`] policy does not fit.
///
/// [`Allocator::try_allocate_once`]: crate::Allocator::try_allocate_once
/// [`Allocator::allocate`]: crate::Allocator::allocate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocStatus {
    /// A value was committed and is owned by this caller.
    Committed {
        /// The newly issued value.
        value: u64,
    },
    /// The conditional write lost to a concurrent writer.
    Conflict,
}

impl AllocStatus {
    pub const fn committed(self) -> Option<u64> {
        match self {
            Self::Committed { value } => Some(value),
            Self::Conflict => None,
        }
    }
}
