pub mod context;
pub mod errors;
pub mod http;
pub mod logging;
pub mod notice;
pub mod tasks;

pub use context::AppContext;
pub use errors::AnkimorphError;
pub use notice::{
    NoticeBoard,
    Severity,
};
