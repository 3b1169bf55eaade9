use dashmap::DashMap;

use crate::{
    domain::{ChainClient, Domain},
    error::{OrchestratorError, OrchestratorResult},
};

#[derive(Debug, Default)]
pub struct Clients {
    clients: DashMap<Domain, Box<dyn ChainClient>>,
}

impl Clients {
    /// Get the client for a domain if we have one cached,
    /// otherwise create a new one and save it in the cache.
    pub async fn get_or_create_client(
        &self,
        domain: &Domain,
    ) -> OrchestratorResult<dashmap::mapref::one::Ref<'_, Domain, Box<dyn ChainClient>>> {
        if !self.clients.contains_key(domain) {
            let client = domain.generate_client().await?;
            self.clients.insert(domain.clone(), client);
        }

        self.clients
            .get(domain)
            .ok_or(OrchestratorError::generic_err(
                "Failed to get client from cache",
            ))
    }
}
