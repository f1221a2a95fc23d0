const ENV_WEATHER_BASE_URL: &str = "STYLEMIRROR_WEATHER_URL";
const ENV_DB_PATH: &str = "STYLEMIRROR_DB_PATH";

const DEFAULT_WEATHER_BASE_URL: &str = "https://api.open-meteo.com/v1/forecast";
const DEFAULT_DB_FILE: &str = "stylemirror.db";

pub fn load_dotenv() {
    let _ = dotenvy::dotenv();
}

fn env_trimmed(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn weather_base_url() -> String {
    env_trimmed(ENV_WEATHER_BASE_URL).unwrap_or_else(|| DEFAULT_WEATHER_BASE_URL.to_string())
}

/// Explicit path wins over the env override, which wins over the default.
pub fn resolve_db_path(explicit: Option<&str>) -> String {
    if let Some(path) = explicit {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }
    env_trimmed(ENV_DB_PATH).unwrap_or_else(|| DEFAULT_DB_FILE.to_string())
}
