use thiserror::Error;

/// Rejected registration: the definition itself is malformed. The offending
/// call has no effect; prior state is left unchanged.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("entity id must not be empty")]
    EmptyEntityId,
    #[error("entity id {id:?} is already registered")]
    DuplicateEntityId { id: String },
    #[error("entity {id:?} has no draw callback")]
    MissingDrawCallback { id: String },
    #[error("entity {id:?} bounding box {width}x{height} has a negative dimension")]
    NegativeBoundingBox { id: String, width: f32, height: f32 },
    #[error("key code {key_code} is already bound")]
    DuplicateKeyBinding { key_code: u32 },
    #[error("key binding for code {key_code} defines neither a press nor a release callback")]
    EmptyKeyBinding { key_code: u32 },
}

/// An operation referenced an id or key code that is not registered.
#[derive(Debug, Error)]
pub enum NotFoundError {
    #[error("no entity with id {id:?}")]
    Entity { id: String },
    #[error("no key binding for code {key_code}")]
    KeyBinding { key_code: u32 },
}
