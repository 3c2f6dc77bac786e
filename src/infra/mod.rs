pub mod downloads;
pub mod webdriver;

pub use downloads::DownloadDir;
pub use webdriver::WebDriverSession;
