use std::path::Path;

use anyhow::Context;

/// Solidity source of the token and vault as deployed.
pub const ZENITH_CORE_SOL: &str = include_str!("ZenithCore.sol");

/// A browsable source file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContractSource {
    pub file_name: &'static str,
    pub contract: &'static str,
    pub source: &'static str,
}

/// Both contracts are deployed from one compilation unit.
pub const CATALOG: &[ContractSource] = &[
    ContractSource {
        file_name: "ZenithVault.sol",
        contract: "ZenithVault",
        source: ZENITH_CORE_SOL,
    },
    ContractSource {
        file_name: "ZenithFi.sol",
        contract: "ZenithFi",
        source: ZENITH_CORE_SOL,
    },
];

/// Look up a source by file or contract name, case-insensitively.
/// `None` selects the vault.
pub fn find_source(name: Option<&str>) -> Option<&'static ContractSource> {
    let Some(name) = name else {
        return CATALOG.first();
    };

    CATALOG.iter().find(|entry| {
        entry.file_name.eq_ignore_ascii_case(name) || entry.contract.eq_ignore_ascii_case(name)
    })
}

impl ContractSource {
    /// Write the source to `dir/<file_name>` and return the path written.
    pub fn export_to(&self, dir: &Path) -> anyhow::Result<std::path::PathBuf> {
        let path = dir.join(self.file_name);
        std::fs::write(&path, self.source)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(path)
    }
}
