use serde_aux::field_attributes::deserialize_number_from_string;

#[derive(serde::Deserialize, Clone)]
pub struct Settings {
    pub webdriver: WebdriverSettings,
    pub downloader: DownloaderSettings,
}

#[derive(serde::Deserialize, Clone)]
pub struct WebdriverSettings {
    /// Address of a running WebDriver endpoint, e.g. chromedriver or a
    /// selenium hub like http://chrome:4444/wd/hub
    pub url: String,
    pub browser: String,
    pub headless: bool,
}

#[derive(serde::Deserialize, Clone)]
pub struct DownloaderSettings {
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub timeout_secs: u64,
}

pub fn get_configuration() -> Result<Settings, config::ConfigError> {
    let base_path = std::env::current_dir().expect("Failed to determine the current directory");

    let settings = config::Config::builder()
        .set_default("webdriver.url", "http://localhost:9515")?
        .set_default("webdriver.browser", "chrome")?
        .set_default("webdriver.headless", true)?
        .set_default("downloader.timeout_secs", 10)?
        .add_source(config::File::from(base_path.join("configuration.yaml")).required(false))
        .add_source(
            config::Environment::with_prefix("HOLOCRON")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    settings.try_deserialize::<Settings>()
}
