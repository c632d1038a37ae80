pub mod browser_session;
pub mod cdp_session;

pub use browser_session::{BrowserSession, ElementHandle};
pub use cdp_session::CdpSession;
