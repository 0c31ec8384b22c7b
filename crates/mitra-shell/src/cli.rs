// SPDX-License-Identifier: AGPL-3.0
// Mitra Shell - Command-line interface

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// KlikQuick mitra app without a screen.
///
/// Drives the same session gate, deep link router and push bridge as the
/// mobile app; navigations are printed instead of rendered.
#[derive(Debug, Parser)]
#[command(name = "mitra")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Directory holding settings.json and storage.json
    #[arg(long, value_name = "DIR", global = true)]
    pub config_dir: Option<PathBuf>,

    /// Override the API base URL for this run
    #[arg(long, value_name = "URL", global = true, env = "MITRA_API_URL")]
    pub api_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Start the app: session gate, push registration, initial link
    Launch {
        /// URL the app was opened with
        #[arg(long, value_name = "URI")]
        url: Option<String>,

        /// Notification JSON that cold-started the app
        #[arg(long, value_name = "JSON")]
        notification: Option<String>,

        /// Simulate the user refusing notification permission
        #[arg(long)]
        deny_push: bool,
    },
    /// Open a deep link or universal link in the running app
    Open {
        #[arg(value_name = "URI")]
        uri: String,
    },
    /// Deliver a push notification
    Push {
        /// Notification JSON: {"notification":{...},"data":{...}}
        #[arg(value_name = "JSON")]
        json: String,

        #[arg(long, value_enum, default_value = "opened")]
        kind: DeliveryKind,

        /// Tap the banner after a foreground delivery
        #[arg(long)]
        press: bool,

        /// Keep running until the banner hides itself
        #[arg(long, conflicts_with = "press")]
        wait: bool,
    },
    /// Request an OTP for a phone number
    Login {
        #[arg(value_name = "PHONE")]
        phone: String,
    },
    /// Verify the OTP and start a session
    Verify {
        #[arg(value_name = "PHONE")]
        phone: String,
        #[arg(value_name = "CODE")]
        code: String,
    },
    /// End the current session
    Logout,
    /// Manage customer contacts
    Contacts {
        #[command(subcommand)]
        action: ContactsCommand,
    },
    /// Show the saldo
    Balance,
    /// Request a saldo top-up
    TopUp {
        amount: u64,
        /// Payment method, e.g. a bank code
        method: String,
    },
    /// Confirm a pending top-up was paid
    ConfirmTopUp { id: String },
    /// Withdraw saldo to a bank account
    Withdraw {
        amount: u64,
        bank: String,
        account_number: String,
        account_name: String,
    },
    /// Transfer saldo to another mitra
    Transfer {
        #[arg(value_name = "PHONE")]
        phone: String,
        amount: u64,
        #[arg(long)]
        note: Option<String>,
    },
    /// Live orders awaiting approval
    Orders {
        #[command(subcommand)]
        action: OrdersCommand,
    },
    /// Transaction history and manual entries
    Transactions {
        #[command(subcommand)]
        action: TransactionsCommand,
    },
    /// List the paths the deep link router accepts
    Routes,
    /// Print the effective settings
    Settings,
}

#[derive(Debug, Subcommand)]
pub enum ContactsCommand {
    List,
    Show {
        id: String,
    },
    Add {
        name: String,
        phone: String,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        address: Option<String>,
    },
    Update {
        id: String,
        name: String,
        phone: String,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        address: Option<String>,
    },
    Delete {
        id: String,
    },
    /// Parse a .vcf file and optionally submit the contacts
    Import {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        /// Add the parsed contacts instead of only listing them
        #[arg(long)]
        submit: bool,
    },
}

#[derive(Debug, Subcommand)]
pub enum OrdersCommand {
    List,
    Show {
        id: String,
    },
    Approve {
        id: String,
    },
    Reject {
        id: String,
        #[arg(long, default_value = "")]
        reason: String,
    },
}

#[derive(Debug, Subcommand)]
pub enum TransactionsCommand {
    List,
    /// Record a transaction for a contact
    Add {
        contact_id: String,
        amount: u64,
        description: String,
    },
}

/// How the notification reaches the app
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DeliveryKind {
    /// App in the foreground: shows the banner
    Foreground,
    /// Tapped while the app was in the background
    Opened,
    /// Tapped while the app was closed
    ColdStart,
}
