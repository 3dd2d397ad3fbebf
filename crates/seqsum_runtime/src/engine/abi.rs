use anyhow::Result;
use sha2::{Digest, Sha256};
use wasmparser::{ExternalKind, Parser, Payload};
use wasmtime::{ExternType, FuncType, ValType};

use super::error::SeqsumError;

pub const EXPORT_INIT: &str = "init";
pub const EXPORT_SUM: &str = "sum";
pub const EXPORT_RELEASE: &str = "release";
pub const EXPORT_LIVE: &str = "live";

#[derive(Debug, Clone)]
pub struct ModuleMetadata {
    /// Number of imports the module declares. Must be zero.
    pub import_count: u32,
    /// Names of the exported functions, in declaration order.
    pub function_exports: Vec<String>,
    pub sha256: [u8; 32],
}

impl ModuleMetadata {
    pub fn exports_function(&self, name: &str) -> bool {
        self.function_exports.iter().any(|export| export == name)
    }

    pub fn sha256_hex(&self) -> String {
        self.sha256.iter().map(|b| format!("{b:02x}")).collect()
    }
}

/// Precondition: data is a binary of the WASM module.
pub(crate) fn inspect(data: &[u8]) -> Result<ModuleMetadata> {
    let mut import_count = 0;
    let mut function_exports = Vec::new();
    for payload in Parser::new(0).parse_all(data) {
        match payload? {
            Payload::ImportSection(section) => {
                import_count += section.count();
            }
            Payload::ExportSection(section) => {
                for export in section {
                    let export = export?;
                    if export.kind == ExternalKind::Func {
                        function_exports.push(export.name.to_string());
                    }
                }
            }
            Payload::End(_) => {
                break;
            }
            _ => {}
        }
    }

    let sha256: [u8; 32] = Sha256::digest(data).into();
    tracing::debug!(
        "module has {} imports, {} function exports",
        import_count,
        function_exports.len()
    );
    Ok(ModuleMetadata {
        import_count,
        function_exports,
        sha256,
    })
}

/// Check the compiled module against the sequence ABI.
///
/// `init` and `sum` are required; `release` and `live` are optional but must
/// have the right signature when present. The module must not import anything.
pub(crate) fn check(module: &wasmtime::Module) -> Result<(), SeqsumError> {
    if let Some(import) = module.imports().next() {
        return Err(SeqsumError::AbiMismatch(format!(
            "module must be self-contained, but imports `{}::{}`",
            import.module(),
            import.name()
        )));
    }

    check_export(module, EXPORT_INIT, &[ValType::I32, ValType::I32], &[ValType::I32], true)?;
    check_export(module, EXPORT_SUM, &[ValType::I32], &[ValType::I64], true)?;
    check_export(module, EXPORT_RELEASE, &[ValType::I32], &[], false)?;
    check_export(module, EXPORT_LIVE, &[], &[ValType::I32], false)?;
    Ok(())
}

fn check_export(
    module: &wasmtime::Module,
    name: &str,
    params: &[ValType],
    results: &[ValType],
    required: bool,
) -> Result<(), SeqsumError> {
    let Some(ty) = module.get_export(name) else {
        if required {
            return Err(SeqsumError::AbiMismatch(format!(
                "missing function export `{name}`"
            )));
        }
        return Ok(());
    };

    let ExternType::Func(func) = ty else {
        return Err(SeqsumError::AbiMismatch(format!(
            "export `{name}` is not a function"
        )));
    };

    if !signature_matches(&func, params, results) {
        return Err(SeqsumError::AbiMismatch(format!(
            "export `{name}` has signature {}, expected {}",
            describe(func.params(), func.results()),
            describe(params.iter().cloned(), results.iter().cloned()),
        )));
    }
    Ok(())
}

fn signature_matches(func: &FuncType, params: &[ValType], results: &[ValType]) -> bool {
    fn same(actual: impl ExactSizeIterator<Item = ValType>, expected: &[ValType]) -> bool {
        actual.len() == expected.len()
            && actual
                .zip(expected)
                .all(|(a, e)| ValType::eq(&a, e))
    }
    same(func.params(), params) && same(func.results(), results)
}

fn describe(
    params: impl Iterator<Item = ValType>,
    results: impl Iterator<Item = ValType>,
) -> String {
    let params = params.map(|t| t.to_string()).collect::<Vec<_>>().join(", ");
    let results = results.map(|t| t.to_string()).collect::<Vec<_>>().join(", ");
    format!("({params}) -> ({results})")
}
