pub mod chrome;
pub mod driver;
pub mod locator;

pub use chrome::{ChromeLauncher, ChromePage};
pub use driver::{BrowserProvider, DriverError, PageDriver};
pub use locator::Locator;
