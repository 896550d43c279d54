//! Menu command registry: key -> `{precondition, invoke}` handler records.
//!
//! Handlers are pure: they read the [`CommandContext`] and describe an effect
//! for the presentation layer to carry out. Sending a payment is reached only
//! through `CommandEffect::OpenView(View::SendPayment)`.

use thiserror::Error;

use crate::wallet::WalletSession;

pub const FREIGHTER_INSTALL_URL: &str = "https://www.freighter.app/";
pub const DEVELOPER_DOCS_URL: &str = "https://developers.stellar.org/";
pub const SOROBAN_DOCS_URL: &str = "https://soroban.stellar.org/";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKey {
    InstallWallet,
    ConnectWallet,
    CopyPublicKey,
    CheckNetwork,
    MyAccount,
    RecentPayments,
    SendPayment,
    DeveloperDocs,
    SorobanDocs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandGroup {
    Wallet,
    Stellar,
    UsefulLinks,
}

impl CommandGroup {
    pub fn heading(self) -> &'static str {
        match self {
            Self::Wallet => "Freighter Wallet",
            Self::Stellar => "Stellar",
            Self::UsefulLinks => "Useful Links",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    MyAccount,
    RecentPayments,
    SendPayment,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandEffect {
    OpenView(View),
    Notify(String),
    OpenUrl(&'static str),
    /// Ask the wallet to allow this site, then re-probe the session.
    RequestConnect,
    CopyToClipboard { text: String, notice: &'static str },
}

#[derive(Debug, Clone, Copy)]
pub struct CommandContext<'a> {
    pub session: &'a WalletSession,
}

impl<'a> CommandContext<'a> {
    pub fn new(session: &'a WalletSession) -> Self {
        Self { session }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("command {0:?} is not registered")]
    Unknown(CommandKey),
    #[error("command {0:?} is not available in the current wallet state")]
    Unavailable(CommandKey),
}

#[derive(Debug, Clone, Copy)]
pub struct CommandHandler {
    pub key: CommandKey,
    pub group: CommandGroup,
    pub label: &'static str,
    pub precondition: fn(&WalletSession) -> bool,
    pub invoke: fn(&CommandContext<'_>) -> CommandEffect,
}

#[derive(Debug, Clone)]
pub struct CommandRegistry {
    handlers: Vec<CommandHandler>,
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandRegistry {
    /// The stock menu, in display order.
    pub fn new() -> Self {
        Self::with_handlers(vec![
            CommandHandler {
                key: CommandKey::InstallWallet,
                group: CommandGroup::Wallet,
                label: "Install Freighter Wallet",
                precondition: |session| !session.connected,
                invoke: |_| CommandEffect::OpenUrl(FREIGHTER_INSTALL_URL),
            },
            CommandHandler {
                key: CommandKey::ConnectWallet,
                group: CommandGroup::Wallet,
                label: "Connect Freighter Wallet",
                precondition: |session| session.connected && !session.allowed,
                invoke: |_| CommandEffect::RequestConnect,
            },
            CommandHandler {
                key: CommandKey::CopyPublicKey,
                group: CommandGroup::Wallet,
                label: "Copy My Public Key",
                precondition: wallet_allowed,
                invoke: copy_public_key,
            },
            CommandHandler {
                key: CommandKey::CheckNetwork,
                group: CommandGroup::Wallet,
                label: "Check Network",
                precondition: wallet_allowed,
                invoke: check_network,
            },
            CommandHandler {
                key: CommandKey::MyAccount,
                group: CommandGroup::Stellar,
                label: "My Wallet",
                precondition: always,
                invoke: |_| CommandEffect::OpenView(View::MyAccount),
            },
            CommandHandler {
                key: CommandKey::RecentPayments,
                group: CommandGroup::Stellar,
                label: "Recent Payments",
                precondition: always,
                invoke: |_| CommandEffect::OpenView(View::RecentPayments),
            },
            CommandHandler {
                key: CommandKey::SendPayment,
                group: CommandGroup::Stellar,
                label: "Send Payment",
                precondition: always,
                invoke: |_| CommandEffect::OpenView(View::SendPayment),
            },
            CommandHandler {
                key: CommandKey::DeveloperDocs,
                group: CommandGroup::UsefulLinks,
                label: "Stellar Docs",
                precondition: always,
                invoke: |_| CommandEffect::OpenUrl(DEVELOPER_DOCS_URL),
            },
            CommandHandler {
                key: CommandKey::SorobanDocs,
                group: CommandGroup::UsefulLinks,
                label: "Soroban Docs",
                precondition: always,
                invoke: |_| CommandEffect::OpenUrl(SOROBAN_DOCS_URL),
            },
        ])
    }

    /// Later handlers for an already registered key replace the earlier one.
    pub fn with_handlers(handlers: impl IntoIterator<Item = CommandHandler>) -> Self {
        let mut registry = Self {
            handlers: Vec::new(),
        };
        for handler in handlers {
            registry.register(handler);
        }
        registry
    }

    pub fn register(&mut self, handler: CommandHandler) {
        match self.handlers.iter_mut().find(|h| h.key == handler.key) {
            Some(slot) => *slot = handler,
            None => self.handlers.push(handler),
        }
    }

    pub fn get(&self, key: CommandKey) -> Option<&CommandHandler> {
        self.handlers.iter().find(|handler| handler.key == key)
    }

    /// Handlers whose precondition holds for `session`, in display order.
    pub fn available<'a>(
        &'a self,
        session: &'a WalletSession,
    ) -> impl Iterator<Item = &'a CommandHandler> + 'a {
        self.handlers
            .iter()
            .filter(move |handler| (handler.precondition)(session))
    }

    pub fn dispatch(
        &self,
        key: CommandKey,
        ctx: &CommandContext<'_>,
    ) -> Result<CommandEffect, CommandError> {
        let handler = self.get(key).ok_or(CommandError::Unknown(key))?;
        if !(handler.precondition)(ctx.session) {
            return Err(CommandError::Unavailable(key));
        }
        Ok((handler.invoke)(ctx))
    }
}

fn always(_: &WalletSession) -> bool {
    true
}

fn wallet_allowed(session: &WalletSession) -> bool {
    session.connected && session.allowed
}

fn copy_public_key(ctx: &CommandContext<'_>) -> CommandEffect {
    match ctx.session.public_key {
        Some(key) => CommandEffect::CopyToClipboard {
            text: key.encode(),
            notice: "Your public key has been copied to the clipboard.",
        },
        None => CommandEffect::Notify("The wallet did not share a public key.".to_string()),
    }
}

fn check_network(ctx: &CommandContext<'_>) -> CommandEffect {
    let network = ctx
        .session
        .network
        .map_or("an unknown", |network| network.wallet_name());
    CommandEffect::Notify(format!("You are connected to the {network} network."))
}
