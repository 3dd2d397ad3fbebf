//! The bundled computation module.
//!
//! The module is kept as WebAssembly text and assembled on demand. It exports
//! `init`, `sum`, `release` and `live`, declares no imports, and keeps its
//! linear memory private.

use std::path::Path;

use anyhow::{Context as _, Result};

/// Text form of the computation module.
pub const WAT: &str = include_str!("sum.wat");

/// Assemble the computation module into its binary form.
pub fn wasm() -> Result<Vec<u8>> {
    wat::parse_str(WAT).context("failed to assemble the bundled computation module")
}

/// Assemble the module and write it to `path`.
pub fn save(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let bytes = wasm()?;
    std::fs::write(path, bytes).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use wasmparser::{ExternalKind, Parser, Payload};

    use super::*;

    #[test]
    fn exports_the_sequence_abi_without_imports() {
        let bytes = wasm().unwrap();
        wasmparser::validate(&bytes).unwrap();

        let mut exports = Vec::new();
        let mut imports = 0;
        for payload in Parser::new(0).parse_all(&bytes) {
            match payload.unwrap() {
                Payload::ImportSection(section) => imports += section.count(),
                Payload::ExportSection(section) => {
                    for export in section {
                        let export = export.unwrap();
                        exports.push((export.name.to_string(), export.kind));
                    }
                }
                _ => {}
            }
        }

        assert_eq!(imports, 0);
        exports.sort_by(|a, b| a.0.cmp(&b.0));
        assert_eq!(
            exports,
            vec![
                ("init".to_string(), ExternalKind::Func),
                ("live".to_string(), ExternalKind::Func),
                ("release".to_string(), ExternalKind::Func),
                ("sum".to_string(), ExternalKind::Func),
            ]
        );
    }

    #[test]
    fn save_writes_a_wasm_binary() {
        let td = tempfile::tempdir().unwrap();
        let path = td.path().join("sum.wasm");
        save(&path).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[..4], b"\0asm");
    }
}
