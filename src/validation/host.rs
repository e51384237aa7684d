//! Host functions a contract may import, with their exact signatures.

use crate::binary::types::ValueType::{self, I32, I64};

pub const DEBUG_MODULE: &str = "debug";
pub const ETHEREUM_MODULE: &str = "ethereum";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostFunc {
    pub name: &'static str,
    pub params: &'static [ValueType],
    pub results: &'static [ValueType],
}

const fn func(
    name: &'static str,
    params: &'static [ValueType],
    results: &'static [ValueType],
) -> HostFunc {
    HostFunc {
        name,
        params,
        results,
    }
}

pub static DEBUG_FUNCS: &[HostFunc] = &[
    func("print32", &[I32], &[]),
    func("print64", &[I64], &[]),
    func("printMem", &[I32, I32], &[]),
    func("printMemHex", &[I32, I32], &[]),
    func("printStorage", &[I32], &[]),
    func("printStorageHex", &[I32], &[]),
];

pub static ETHEREUM_FUNCS: &[HostFunc] = &[
    func("useGas", &[I64], &[]),
    func("getGasLeft", &[], &[I64]),
    func("getAddress", &[I32], &[]),
    func("getExternalBalance", &[I32, I32], &[]),
    func("getBlockHash", &[I64, I32], &[I32]),
    func("getBlockCoinbase", &[I32], &[]),
    func("getBlockDifficulty", &[I32], &[]),
    func("getBlockGasLimit", &[], &[I64]),
    func("getBlockNumber", &[], &[I64]),
    func("getBlockTimestamp", &[], &[I64]),
    func("getTxGasPrice", &[I32], &[]),
    func("getTxOrigin", &[I32], &[]),
    func("getCaller", &[I32], &[]),
    func("getCallValue", &[I32], &[]),
    func("getCallDataSize", &[], &[I32]),
    func("callDataCopy", &[I32, I32, I32], &[]),
    func("getCodeSize", &[], &[I32]),
    func("codeCopy", &[I32, I32, I32], &[]),
    func("getExternalCodeSize", &[I32], &[I32]),
    func("externalCodeCopy", &[I32, I32, I32, I32], &[]),
    func("getReturnDataSize", &[], &[I32]),
    func("returnDataCopy", &[I32, I32, I32], &[]),
    func("storageStore", &[I32, I32], &[]),
    func("storageLoad", &[I32, I32], &[]),
    func("call", &[I64, I32, I32, I32, I32], &[I32]),
    func("callCode", &[I64, I32, I32, I32, I32], &[I32]),
    func("callDelegate", &[I64, I32, I32, I32], &[I32]),
    func("callStatic", &[I64, I32, I32, I32], &[I32]),
    func("create", &[I32, I32, I32, I32], &[I32]),
    func("log", &[I32, I32, I32, I32, I32, I32, I32], &[]),
    func("finish", &[I32, I32], &[]),
    func("revert", &[I32, I32], &[]),
    func("selfDestruct", &[I32], &[]),
];

pub fn lookup(module: &str, field: &str) -> Option<&'static HostFunc> {
    let funcs = match module {
        DEBUG_MODULE => DEBUG_FUNCS,
        ETHEREUM_MODULE => ETHEREUM_FUNCS,
        _ => return None,
    };
    funcs.iter().find(|f| f.name == field)
}
