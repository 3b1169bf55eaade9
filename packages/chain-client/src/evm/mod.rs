pub mod base_client;
pub mod request_provider_client;
