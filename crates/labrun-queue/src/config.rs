/// Connection settings for the remote queue store.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Base URL of the store, without the `/rest/v1` suffix.
    pub base_url: String,
    /// Service-role key, sent as both `apikey` and bearer token.
    pub service_key: String,
}
