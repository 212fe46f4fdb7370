pub mod background_jobs;
pub mod deal_service;
pub mod error;
pub mod offer_service;
pub mod presence;
pub mod sms;
