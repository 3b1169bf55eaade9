//! Deterministic address prediction. Everything here is pure: the same
//! deployer, salt and init code always hash to the same address, which is
//! what makes interrupted deployments resumable.

use alloy::primitives::{keccak256, Address, Bytes, B256};
use alloy::sol_types::SolValue;

pub fn init_code_hash(init_code: &[u8]) -> B256 {
    keccak256(init_code)
}

/// EIP-1014: keccak256(0xff ++ deployer ++ salt ++ keccak256(init_code))[12..]
pub fn create2_address(deployer: Address, salt: B256, init_code_hash: B256) -> Address {
    deployer.create2(salt, init_code_hash)
}

/// Salt the spawning contract uses when it creates the instance proxies:
/// one deterministic proxy set per transaction sender.
pub fn sender_salt(sender: Address) -> B256 {
    keccak256(sender.as_slice())
}

/// Init code of a transparent proxy pointing at `logic`, administered by
/// `admin`, with no initializer call data. The proxy is deliberately not
/// initialized through its constructor so the same bytecode can be deployed
/// on every chain.
pub fn transparent_proxy_init_code(
    proxy_creation_code: &[u8],
    logic: Address,
    admin: Address,
) -> Vec<u8> {
    let ctor_args = (logic, admin, Bytes::new()).abi_encode_params();
    let mut code = proxy_creation_code.to_vec();
    code.extend_from_slice(&ctor_args);
    code
}

/// Address of the proxy the spawner will create for `logic` on behalf of
/// `sender`, before it exists.
pub fn predict_transparent_proxy_address(
    spawner: Address,
    logic: Address,
    admin: Address,
    sender: Address,
    proxy_creation_code: &[u8],
) -> Address {
    let init_code = transparent_proxy_init_code(proxy_creation_code, logic, admin);
    create2_address(spawner, sender_salt(sender), init_code_hash(&init_code))
}
