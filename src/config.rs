// config.rs
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_maxage: i64,
    pub port: u16,
    // SMS gateway (Mobizon-style HTTP API)
    pub sms_api_key: String,
    pub sms_api_url: String,
    // Deal lifecycle tuning
    pub platform_commission_percent: i64,
    pub work_review_period_hours: i64,
    pub auto_complete_interval_secs: u64,
}

impl Config {
    pub fn init() -> Config {
        let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let jwt_secret = std::env::var("JWT_SECRET_KEY").expect("JWT_SECRET_KEY must be set");
        let jwt_maxage = std::env::var("JWT_MAXAGE").expect("JWT_MAXAGE must be set");

        // SMS gateway configurations (with defaults)
        let sms_api_key = std::env::var("SMS_API_KEY")
            .unwrap_or_else(|_| "test_api_key".to_string());
        let sms_api_url = std::env::var("SMS_API_URL")
            .unwrap_or_else(|_| "https://api.mobizon.kz/service".to_string());

        let platform_commission_percent = std::env::var("PLATFORM_COMMISSION_PERCENT")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(10);
        let work_review_period_hours = std::env::var("WORK_REVIEW_PERIOD_HOURS")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(24);
        let auto_complete_interval_secs = std::env::var("AUTO_COMPLETE_INTERVAL_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(300);

        Config {
            database_url,
            jwt_secret,
            jwt_maxage: jwt_maxage.parse::<i64>().unwrap(),
            port: 8000,
            sms_api_key,
            sms_api_url,
            platform_commission_percent,
            work_review_period_hours,
            auto_complete_interval_secs,
        }
    }
}
