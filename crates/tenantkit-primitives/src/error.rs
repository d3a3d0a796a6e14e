/// Error type for primitives operations.
#[derive(Debug, thiserror::Error)]
pub enum PrimitivesError {
    #[error("invalid sign message component {field}: {reason}")]
    InvalidMessageComponent { field: &'static str, reason: String },
}
