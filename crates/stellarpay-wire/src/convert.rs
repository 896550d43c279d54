//! Conversions between domain types and their XDR counterparts.

use stellar_xdr::curr::{
    self as xdr, AccountId, AlphaNum12, AlphaNum4, AssetCode12, AssetCode4, MuxedAccount, Uint256,
};
use stellarpay_types::{AssetCode, AssetDescriptor, PublicKey, ValidationError};

pub fn muxed_account(key: &PublicKey) -> MuxedAccount {
    MuxedAccount::Ed25519(Uint256(*key.as_bytes()))
}

/// Muxed sub-accounts collapse to their underlying ed25519 account.
pub fn public_key_from_muxed(account: &MuxedAccount) -> PublicKey {
    match account {
        MuxedAccount::Ed25519(key) => PublicKey::from_raw(key.0),
        MuxedAccount::MuxedEd25519(muxed) => PublicKey::from_raw(muxed.ed25519.0),
    }
}

pub fn account_id(key: &PublicKey) -> AccountId {
    AccountId(xdr::PublicKey::PublicKeyTypeEd25519(Uint256(*key.as_bytes())))
}

pub fn public_key_from_account_id(id: &AccountId) -> PublicKey {
    match &id.0 {
        xdr::PublicKey::PublicKeyTypeEd25519(key) => PublicKey::from_raw(key.0),
    }
}

pub fn asset_to_xdr(asset: &AssetDescriptor) -> xdr::Asset {
    match asset {
        AssetDescriptor::Native => xdr::Asset::Native,
        AssetDescriptor::Credit { code, issuer } => {
            let raw = code.as_str().as_bytes();
            if raw.len() <= 4 {
                let mut bytes = [0u8; 4];
                bytes[..raw.len()].copy_from_slice(raw);
                xdr::Asset::CreditAlphanum4(AlphaNum4 {
                    asset_code: AssetCode4(bytes),
                    issuer: account_id(issuer),
                })
            } else {
                let mut bytes = [0u8; 12];
                bytes[..raw.len()].copy_from_slice(raw);
                xdr::Asset::CreditAlphanum12(AlphaNum12 {
                    asset_code: AssetCode12(bytes),
                    issuer: account_id(issuer),
                })
            }
        }
    }
}

pub fn asset_from_xdr(asset: &xdr::Asset) -> Result<AssetDescriptor, ValidationError> {
    match asset {
        xdr::Asset::Native => Ok(AssetDescriptor::Native),
        xdr::Asset::CreditAlphanum4(alpha) => Ok(AssetDescriptor::Credit {
            code: asset_code_from_padded(&alpha.asset_code.0)?,
            issuer: public_key_from_account_id(&alpha.issuer),
        }),
        xdr::Asset::CreditAlphanum12(alpha) => Ok(AssetDescriptor::Credit {
            code: asset_code_from_padded(&alpha.asset_code.0)?,
            issuer: public_key_from_account_id(&alpha.issuer),
        }),
    }
}

fn asset_code_from_padded(bytes: &[u8]) -> Result<AssetCode, ValidationError> {
    let end = bytes.iter().rposition(|b| *b != 0).map_or(0, |idx| idx + 1);
    let code = std::str::from_utf8(&bytes[..end])
        .map_err(|_| ValidationError::InvalidAssetCode(format!("{bytes:?}")))?;
    AssetCode::parse(code)
}
