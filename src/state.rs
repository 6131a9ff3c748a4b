//! Shared application state

use aws_sdk_s3::Client as S3Client;
use aws_sdk_sesv2::Client as SesClient;
use sqlx::PgPool;

use crate::config::Config;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// PostgreSQL connection pool
    pub pool: PgPool,
    /// AWS SES client for sending emails
    pub ses: SesClient,
    /// AWS S3 client (product/category images)
    pub s3: S3Client,
    /// HTTP client for Stripe and Gemini APIs
    pub http: reqwest::Client,
    /// JWT secret for access tokens
    pub jwt_secret: String,
    /// Stripe secret key
    pub stripe_secret_key: String,
    /// Stripe webhook signing secret
    pub stripe_webhook_secret: String,
    /// URL to redirect after successful checkout
    pub checkout_success_url: String,
    /// URL to redirect after cancelled checkout
    pub checkout_cancel_url: String,
    /// Gemini API key
    pub gemini_api_key: String,
    /// SES sender email address
    pub ses_from_email: String,
    /// Address that receives admin notifications
    pub admin_email: String,
    /// S3 bucket for images
    pub images_s3_bucket: String,
    /// Storefront origin allowed by CORS
    pub frontend_origin: String,
    /// Environment: development | staging | production
    pub environment: String,
    /// Rate limiter for auth routes
    pub rate_limiter: crate::auth::rate_limit::RateLimiter,
}

impl AppState {
    /// Create a new AppState
    pub async fn new(config: &Config) -> Result<Self, BoxError> {
        let pool = PgPool::connect(&config.database_url).await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        let s3 = S3Client::new(&aws_config);

        let ses = if let Ok(ses_region) = std::env::var("SES_REGION") {
            let ses_config = aws_config
                .to_builder()
                .region(aws_config::Region::new(ses_region))
                .build();
            SesClient::new(&ses_config)
        } else {
            SesClient::new(&aws_config)
        };

        Ok(Self {
            pool,
            ses,
            s3,
            http: reqwest::Client::new(),
            jwt_secret: config.jwt_secret.clone(),
            stripe_secret_key: config.stripe_secret_key.clone(),
            stripe_webhook_secret: config.stripe_webhook_secret.clone(),
            checkout_success_url: config.checkout_success_url.clone(),
            checkout_cancel_url: config.checkout_cancel_url.clone(),
            gemini_api_key: config.gemini_api_key.clone(),
            ses_from_email: config.ses_from_email.clone(),
            admin_email: config.admin_email.clone(),
            images_s3_bucket: config.images_s3_bucket.clone(),
            frontend_origin: config.frontend_origin.clone(),
            environment: config.environment.clone(),
            rate_limiter: crate::auth::rate_limit::RateLimiter::new(),
        })
    }
}
