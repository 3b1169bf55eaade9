//! Compiled contract artifacts. The deployment bytecode is read from
//! hardhat-format artifact JSON; linked libraries are patched in by the
//! byte offsets listed under `linkReferences` before hashing or deploying.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use alloy::primitives::Address;
use serde::Deserialize;
use thiserror::Error;

pub type ArtifactResult<T> = Result<T, ArtifactError>;

/// Marker hardhat leaves in the bytecode hex where a library address belongs.
const LINK_PLACEHOLDER: &str = "__$";

#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error("Failed to read artifact for {0}: {1}")]
    Read(String, #[source] std::io::Error),

    #[error("Failed to parse artifact for {0}: {1}")]
    Parse(String, #[source] serde_json::Error),

    #[error("Artifact {0} bytecode is not valid hex")]
    InvalidBytecode(String),

    #[error("Artifact {0} has a link reference outside its bytecode")]
    LinkOutOfBounds(String),

    #[error("Artifact {0} still has unlinked library placeholders")]
    UnlinkedLibrary(String),

    #[error("No address provided for library {1} required by {0}")]
    MissingLibrary(String, String),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    pub contract_name: String,
    pub bytecode: String,
    /// file -> library name -> byte ranges to patch
    #[serde(default)]
    pub link_references: HashMap<String, HashMap<String, Vec<LinkReference>>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LinkReference {
    pub start: usize,
    pub length: usize,
}

impl Artifact {
    /// Deployment bytecode with every library placeholder replaced by its
    /// deployed address. A single differing byte here changes the predicted
    /// create2 address, so the caller must pass the exact same library set
    /// on every run.
    pub fn linked_bytecode(
        &self,
        libraries: &HashMap<String, Address>,
    ) -> ArtifactResult<Vec<u8>> {
        let hex_str = self.bytecode.trim_start_matches("0x");
        let mut hex_bytes = hex_str.as_bytes().to_vec();

        for libs in self.link_references.values() {
            for (lib_name, refs) in libs {
                let addr = libraries.get(lib_name).ok_or_else(|| {
                    ArtifactError::MissingLibrary(self.contract_name.clone(), lib_name.clone())
                })?;
                let addr_hex = hex::encode(addr.as_slice());

                for r in refs {
                    // linkReferences offsets are byte offsets into the decoded
                    // bytecode; the placeholder occupies twice that in hex.
                    let (start, len) = (r.start * 2, r.length * 2);
                    if start + len > hex_bytes.len() || len != addr_hex.len() {
                        return Err(ArtifactError::LinkOutOfBounds(self.contract_name.clone()));
                    }
                    hex_bytes[start..start + len].copy_from_slice(addr_hex.as_bytes());
                }
            }
        }

        let linked = String::from_utf8(hex_bytes)
            .map_err(|_| ArtifactError::InvalidBytecode(self.contract_name.clone()))?;
        if linked.contains(LINK_PLACEHOLDER) {
            return Err(ArtifactError::UnlinkedLibrary(self.contract_name.clone()));
        }

        hex::decode(&linked).map_err(|_| ArtifactError::InvalidBytecode(self.contract_name.clone()))
    }
}

#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        ArtifactStore {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn load(&self, name: &str) -> ArtifactResult<Artifact> {
        let path = self.dir.join(format!("{name}.json"));
        let content = std::fs::read_to_string(&path)
            .map_err(|e| ArtifactError::Read(name.to_string(), e))?;
        serde_json::from_str(&content).map_err(|e| ArtifactError::Parse(name.to_string(), e))
    }

    /// Full initialization code for a deployment: linked bytecode followed by
    /// the abi-encoded constructor arguments.
    pub fn init_code(
        &self,
        name: &str,
        libraries: &HashMap<String, Address>,
        ctor_args: &[u8],
    ) -> ArtifactResult<Vec<u8>> {
        let artifact = self.load(name)?;
        let mut code = artifact.linked_bytecode(libraries)?;
        code.extend_from_slice(ctor_args);
        Ok(code)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use alloy::primitives::address;

    fn linked_artifact() -> Artifact {
        // "__$" + 34 chars + "$__" is the 40-hex-char hardhat placeholder,
        // standing in for a 20 byte address at byte offset 2.
        serde_json::from_value(serde_json::json!({
            "contractName": "ForkableBridge",
            "bytecode": "0x6080__$1234567890123456789012345678901234$__6001",
            "linkReferences": {
                "contracts/lib/CreateChildren.sol": {
                    "CreateChildren": [ { "start": 2, "length": 20 } ]
                }
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_link_patches_address() {
        let artifact = linked_artifact();
        let lib = address!("00000000000000000000000000000000deadbeef");
        let mut libraries = HashMap::new();
        libraries.insert("CreateChildren".to_string(), lib);

        let code = artifact.linked_bytecode(&libraries).unwrap();
        assert_eq!(code[0..2], [0x60, 0x80]);
        assert_eq!(code[2..22], lib.as_slice()[..]);
        assert_eq!(code[22..24], [0x60, 0x01]);
    }

    #[test]
    fn test_missing_library_errors() {
        let artifact = linked_artifact();
        let err = artifact.linked_bytecode(&HashMap::new()).unwrap_err();
        assert!(matches!(err, ArtifactError::MissingLibrary(_, lib) if lib == "CreateChildren"));
    }

    #[test]
    fn test_unlinked_placeholder_detected() {
        // a placeholder present in the bytecode but absent from linkReferences
        let artifact: Artifact = serde_json::from_value(serde_json::json!({
            "contractName": "Broken",
            "bytecode": "0x6080__$1234567890123456789012345678901234$__",
            "linkReferences": {}
        }))
        .unwrap();

        let err = artifact.linked_bytecode(&HashMap::new()).unwrap_err();
        assert!(matches!(err, ArtifactError::UnlinkedLibrary(_)));
    }
}
