//! DynamoDB client module.
//!
//! Builds the AWS SDK DynamoDB client from a [`ClientConfig`] that supports
//! multiple credential sources:
//! - Hardcoded credentials
//! - AWS profiles
//! - Environment variables / default chain

use aws_config::BehaviorVersion;
use aws_config::meta::region::RegionProviderChain;
use aws_config::profile::ProfileFileCredentialsProvider;
use aws_sdk_dynamodb::Client;
use aws_sdk_dynamodb::config::{Credentials, Region};

/// Endpoint of a DynamoDB Local instance on this machine.
pub const LOCAL_ENDPOINT: &str = "http://localhost:8000";
/// Region used against DynamoDB Local.
pub const LOCAL_REGION: &str = "us-west-2";

const DEFAULT_REGION: &str = "us-east-1";

/// Connection settings for the store.
///
/// Credentials priority:
/// 1. Hardcoded credentials (access_key, secret_key, session_token)
/// 2. AWS profile from ~/.aws/credentials
/// 3. Default credential chain (env vars, instance profile, etc.)
#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    pub region: Option<String>,
    pub endpoint_url: Option<String>,
    pub profile: Option<String>,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    pub session_token: Option<String>,
}

impl ClientConfig {
    /// Settings for DynamoDB Local, which accepts any static credentials.
    pub fn local() -> Self {
        Self {
            region: Some(LOCAL_REGION.to_string()),
            endpoint_url: Some(LOCAL_ENDPOINT.to_string()),
            profile: None,
            access_key: Some("akey".to_string()),
            secret_key: Some("asak".to_string()),
            session_token: None,
        }
    }
}

/// Build the AWS SDK DynamoDB client with the given configuration.
pub async fn build_client(config: &ClientConfig) -> Client {
    // Region priority: param > env var > default
    let region_provider = RegionProviderChain::first_try(config.region.clone().map(Region::new))
        .or_default_provider()
        .or_else(DEFAULT_REGION);

    let mut config_loader = aws_config::defaults(BehaviorVersion::latest()).region(region_provider);

    // Credentials priority: hardcoded > profile > env/default chain
    if let (Some(ak), Some(sk)) = (&config.access_key, &config.secret_key) {
        let creds = Credentials::new(
            ak.clone(),
            sk.clone(),
            config.session_token.clone(),
            None,
            "dynadump-hardcoded",
        );
        config_loader = config_loader.credentials_provider(creds);
    } else if let Some(profile_name) = &config.profile {
        let profile_provider = ProfileFileCredentialsProvider::builder()
            .profile_name(profile_name)
            .build();
        config_loader = config_loader.credentials_provider(profile_provider);
    }

    let sdk_config = config_loader.load().await;

    let mut dynamo_config = aws_sdk_dynamodb::config::Builder::from(&sdk_config);

    if let Some(url) = &config.endpoint_url {
        dynamo_config = dynamo_config.endpoint_url(url);
    }

    Client::from_conf(dynamo_config.build())
}
