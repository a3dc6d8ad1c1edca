//! Application services for wallets.

mod wallet;

pub use wallet::{
    TransferReceipt, WITHDRAWAL_DESCRIPTION, WalletError, WalletResult, WalletService,
};
