//! Site locators, file naming and column names shared across both pipelines.

// Credentials
pub const USERNAME_ENV: &str = "FANGRAPHS_USERNAME";
pub const PASSWORD_ENV: &str = "FANGRAPHS_PASSWORD";

// Site
pub const LOGIN_URL: &str =
    "https://blogs.fangraphs.com/wp-login.php?redirect_to=https://www.fangraphs.com/account/login";
pub const REPORT_URL: &str = "https://www.fangraphs.com/leaders/major-league?pos=all&stats=bat&lg=all&qual=0&type=8&season=2025&month=0&season1=2025&ind=0&team=0,ts&rost=&age=&filter=&players=0";
pub const SITE_DOMAIN: &str = "fangraphs.com";
pub const DEFAULT_WEBDRIVER_URL: &str = "http://localhost:9515";

// Page locators
pub const LOGIN_USER_ID: &str = "user_login";
pub const LOGIN_PASS_ID: &str = "user_pass";
pub const LOGIN_SUBMIT_CSS: &str = "button[type='submit'], input[type='submit']";
pub const LOAD_SAVE_REPORT_XPATH: &str = "(//div[contains(text(), 'Load / Save Report')])[2]";
pub const LOAD_REPORT_XPATH: &str = "//a[contains(text(), 'Load')]";
pub const START_DATE_FIELD: &str = "startDate";
pub const END_DATE_FIELD: &str = "endDate";
pub const UPDATE_BUTTON_XPATH: &str = "//div[@class='fgButton' and text()='Update']";
pub const EXPORT_BUTTON_XPATH: &str = "//a[contains(text(), 'Export Data')]";
pub const CHAT_BANNER_CSS: &str = ".header-chat-alert-text";

// Season
pub const SEASON_START_MONTH: u32 = 3;
pub const SEASON_START_DAY: u32 = 1;
pub const MAX_DAYS_TO_EXPORT: u32 = 10;

/// Format accepted on the command line.
pub const CLI_DATE_FORMAT: &str = "%m/%d/%Y";
/// Format used in file names and the range confirmation text.
pub const ISO_DATE_FORMAT: &str = "%Y-%m-%d";

// File naming
pub const RAW_EXPORT_PREFIX: &str = "Hitting_";
pub const CLEANED_PREFIX: &str = "cleaned_hitting_";
pub const NORMALIZED_PREFIX: &str = "norm_hitting_";
pub const NAMES_PREFIX: &str = "names_";
pub const CSV_EXTENSION: &str = "csv";

// Columns
pub const TEAM_COLUMN: &str = "Team";
pub const NAME_COLUMN: &str = "Name";
pub const PA_COLUMN: &str = "PA";
pub const DEFAULT_EXCLUDED_COLUMNS: [&str; 3] = ["NameASCII", "PlayerId", "MLBAMID"];
pub const DEFAULT_INVERTED_COLUMNS: [&str; 5] = ["BABIP+", "Soft%+", "K%+", "O-Swing%", "SwStr%"];
pub const DEFAULT_MIN_PLATE_APPEARANCES: u32 = 10;

/// Written in place of a z-score that cannot be computed.
pub const UNDEFINED_SENTINEL: &str = "NaN";
