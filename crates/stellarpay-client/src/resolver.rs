//! Maps the user's asset selection onto a held balance.

use stellarpay_types::{AssetDescriptor, Balance, NATIVE_SELECTION};

use crate::error::PaymentError;

/// `"native"` always resolves; any other selection must match the code of a
/// credit balance, and the first match in balance order wins.
pub fn resolve_asset(
    selection: &str,
    balances: &[Balance],
) -> Result<AssetDescriptor, PaymentError> {
    let selection = selection.trim();
    if selection == NATIVE_SELECTION {
        return Ok(AssetDescriptor::Native);
    }
    balances
        .iter()
        .find_map(|balance| match balance {
            Balance::Credit { code, issuer, .. } if code.as_str() == selection => {
                Some(AssetDescriptor::Credit {
                    code: code.clone(),
                    issuer: *issuer,
                })
            }
            _ => None,
        })
        .ok_or_else(|| PaymentError::UnknownAsset(selection.to_string()))
}
