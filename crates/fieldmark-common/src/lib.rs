pub mod error;
pub mod protocol;

pub use error::{LocatorError, ParseFieldKindError, SelectorError, StoreError};
pub use protocol::{
    Binding, ExtractionResult, FieldKind, Locator, LocatorTier, MutationKind, MutationRecord,
    NodeId, Request, Response,
};
