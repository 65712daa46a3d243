// Services module - external integrations and shared infrastructure

pub mod encryption;
pub mod linkedin;

pub use encryption::EncryptionService;
pub use linkedin::{
    LinkedInConfig, LinkedInError, LinkedInService, LinkedInUserInfo, PostStatistics,
    TokenResponse,
};
