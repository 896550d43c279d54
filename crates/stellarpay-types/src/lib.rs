pub mod account;
pub mod error;
pub mod ids;
pub mod traits;

pub use account::{
    AccountSnapshot, AssetDescriptor, Balance, BalanceKind, PaymentRecord, PaymentRequest,
    NATIVE_SELECTION,
};
pub use error::{CryptoError, ValidationError};
pub use ids::{Amount, AssetCode, Network, NetworkId, PublicKey, TxHash, AMOUNT_DECIMALS};
pub use traits::Signer;
