use tracing::level_filters::LevelFilter;

const CONFIG_PATH: &str = "CAMPAIGN_MONITOR_CONFIG";

pub fn get_config_path() -> Option<String> {
    let path_from_env = std::env::var(CONFIG_PATH);
    path_from_env.ok().filter(|path| !path.is_empty())
}

const LOG_LEVEL: &str = "LOG_LEVEL";

const DEFAULT_LOG_LEVEL: LevelFilter = LevelFilter::INFO;

pub fn get_log_level() -> LevelFilter {
    let level_from_env = std::env::var(LOG_LEVEL);
    level_from_env.map_or(DEFAULT_LOG_LEVEL, |res| parse_log_level(&res))
}

fn parse_log_level(level: &str) -> LevelFilter {
    level.trim().parse().unwrap_or(DEFAULT_LOG_LEVEL)
}
