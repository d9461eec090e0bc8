pub mod api;
pub mod browser;
pub mod decode;
pub mod dom;
pub mod traits;
pub mod tree;
pub mod types;

pub use api::extract_payload;
pub use browser::BrowserSession;
pub use decode::decode;
pub use dom::extract_cards;
pub use traits::CaptureSession;
pub use types::{CapturedResponse, ExtractReport, Extraction};
