pub mod collection;
pub mod fields;
pub mod media;
pub mod note;

pub use collection::{
    Applied,
    CollectionState,
    FetchKind,
    FetchRequest,
    FetchTicket,
    FilterRefused,
    Mode,
    PagedNoteCollection,
};
pub use fields::{
    FieldList,
    FieldNameConfig,
    ResolvedFields,
};
pub use media::{
    MediaReference,
    MediaSlot,
};
pub use note::{
    Note,
    NoteKey,
    NoteOrigin,
    ProviderKind,
};
