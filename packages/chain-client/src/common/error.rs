/// error type to be returned by all client types.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("client error: {0}")]
    ClientError(String),
    #[error("query error: {0}")]
    QueryError(String),
    #[error("parse error: {0}")]
    ParseError(String),
    #[error("transaction error: {0}")]
    TransactionError(String),
}

impl From<alloy::transports::TransportError> for ClientError {
    fn from(e: alloy::transports::TransportError) -> Self {
        ClientError::QueryError(e.to_string())
    }
}

impl From<alloy::providers::PendingTransactionError> for ClientError {
    fn from(e: alloy::providers::PendingTransactionError) -> Self {
        ClientError::TransactionError(e.to_string())
    }
}

impl From<alloy::primitives::AddressError> for ClientError {
    fn from(e: alloy::primitives::AddressError) -> Self {
        ClientError::ParseError(e.to_string())
    }
}

impl From<alloy::hex::FromHexError> for ClientError {
    fn from(e: alloy::hex::FromHexError) -> Self {
        ClientError::ParseError(e.to_string())
    }
}

impl From<alloy_signer_local::LocalSignerError> for ClientError {
    fn from(e: alloy_signer_local::LocalSignerError) -> Self {
        ClientError::ClientError(e.to_string())
    }
}

impl From<alloy_signer_local::MnemonicBuilderError> for ClientError {
    fn from(e: alloy_signer_local::MnemonicBuilderError) -> Self {
        ClientError::ClientError(e.to_string())
    }
}

impl From<alloy::sol_types::Error> for ClientError {
    fn from(e: alloy::sol_types::Error) -> Self {
        ClientError::ParseError(e.to_string())
    }
}
