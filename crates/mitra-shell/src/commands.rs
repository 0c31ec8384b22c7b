// SPDX-License-Identifier: AGPL-3.0
// Mitra Shell - Command Handlers

use crate::bridge::{AppBridge, LaunchOptions};
use crate::cli::{Commands, ContactsCommand, DeliveryKind, OrdersCommand, TransactionsCommand};
use crate::state::AppState;
use mitra_core::routes::literal_routes;
use mitra_core::{
    AppError, ContactInput, GateDecision, ManualTransactionInput, PermissionStatus,
    PushDelivery, PushPayload, TransferRequest, WithdrawRequest,
};
use serde::Serialize;
use std::fs;
use std::thread;
use std::time::Duration;

type CommandResult = Result<(), AppError>;

fn print_json<T: Serialize>(value: &T) -> CommandResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn parse_payload(json: &str) -> Result<PushPayload, AppError> {
    serde_json::from_str(json)
        .map_err(|e| AppError::InvalidInput(format!("Notifikasi tidak valid: {}", e)))
}

/// Platform conditions for this run, taken from the launch flags
pub fn launch_options(command: &Commands) -> Result<LaunchOptions, AppError> {
    let Commands::Launch {
        notification,
        deny_push,
        ..
    } = command
    else {
        return Ok(LaunchOptions::default());
    };

    Ok(LaunchOptions {
        permission: if *deny_push {
            PermissionStatus::Denied
        } else {
            PermissionStatus::Granted
        },
        initial_notification: notification.as_deref().map(parse_payload).transpose()?,
    })
}

/// Run the session gate, bring up push and apply the launch URL
pub fn launch(bridge: &AppBridge, url: Option<String>) -> CommandResult {
    let decision = bridge.launch(url)?;
    match decision {
        GateDecision::Loading => println!("Status check failed, staying on the loading screen"),
        GateDecision::Authenticate => println!("Not logged in"),
        GateDecision::CompleteProfile { no_hp, .. } => {
            println!("Profile of {} needs completing", no_hp)
        }
        GateDecision::Main => println!("Ready"),
    }
    Ok(())
}

pub fn open(bridge: &AppBridge, uri: String) -> CommandResult {
    if bridge.open_url(uri.clone())?.is_none() {
        println!("Link ignored: {}", uri);
    }
    Ok(())
}

pub fn push(
    bridge: &AppBridge,
    state: &AppState,
    json: &str,
    kind: DeliveryKind,
    press: bool,
    wait: bool,
) -> CommandResult {
    let payload = parse_payload(json)?;
    let delivery = match kind {
        DeliveryKind::Foreground => PushDelivery::Foreground(payload),
        DeliveryKind::Opened => PushDelivery::Opened(payload),
        DeliveryKind::ColdStart => PushDelivery::ColdStart(payload),
    };
    bridge.push(delivery)?;

    if kind == DeliveryKind::Foreground {
        if press {
            bridge.press_banner()?;
        } else if wait {
            thread::sleep(Duration::from_millis(state.config.banner_hide_ms + 100));
        }
    }
    Ok(())
}

/// Commands that talk to the backend directly
pub async fn run_service(state: &AppState, command: &Commands) -> CommandResult {
    match command {
        Commands::Login { phone } => {
            let no_hp = state.auth.send_otp(phone).await?;
            println!("OTP sent to {}", no_hp);
        }
        Commands::Verify { phone, code } => {
            let session = state.auth.verify_otp(phone, code).await?;
            println!("Logged in as {}", session.profile.no_hp);
        }
        Commands::Logout => {
            state.auth.logout()?;
            println!("Logged out");
        }
        Commands::Contacts { action } => contacts(state, action).await?,
        Commands::Balance => {
            let balance = state.wallet.balance().await?;
            println!("Saldo: Rp {}", mitra_core::wallet::format_rupiah(balance.saldo));
        }
        Commands::TopUp { amount, method } => {
            print_json(&state.wallet.top_up(*amount, method).await?)?;
        }
        Commands::ConfirmTopUp { id } => {
            state.wallet.confirm_top_up(id).await?;
            println!("Top-up {} confirmed", id);
        }
        Commands::Withdraw {
            amount,
            bank,
            account_number,
            account_name,
        } => {
            let request = WithdrawRequest {
                amount: *amount,
                bank: bank.clone(),
                account_number: account_number.clone(),
                account_name: account_name.clone(),
            };
            state.wallet.withdraw(&request).await?;
            println!("Withdraw requested");
        }
        Commands::Transfer {
            phone,
            amount,
            note,
        } => {
            let request = TransferRequest {
                recipient_phone: phone.clone(),
                amount: *amount,
                note: note.clone(),
            };
            state.wallet.transfer(&request).await?;
            println!("Transfer sent");
        }
        Commands::Orders { action } => orders(state, action).await?,
        Commands::Transactions { action } => transactions(state, action).await?,
        Commands::Routes => {
            let scheme = &state.config.deep_link_scheme;
            for (path, route) in literal_routes() {
                println!("{}://{} -> {}", scheme, path.trim_start_matches('/'), route);
            }
        }
        Commands::Settings => print_json(&state.config)?,
        // Handled through the bridge
        Commands::Launch { .. } | Commands::Open { .. } | Commands::Push { .. } => {}
    }
    Ok(())
}

async fn contacts(state: &AppState, action: &ContactsCommand) -> CommandResult {
    match action {
        ContactsCommand::List => print_json(&state.contacts.list().await?),
        ContactsCommand::Show { id } => match state.contacts.get(id).await? {
            Some(contact) => print_json(&contact),
            None => Err(AppError::InvalidInput(format!("Kontak {} tidak ditemukan", id))),
        },
        ContactsCommand::Add {
            name,
            phone,
            email,
            address,
        } => {
            let input = ContactInput {
                name: name.clone(),
                phone: phone.clone(),
                email: email.clone(),
                address: address.clone(),
            };
            print_json(&state.contacts.add(&input).await?)
        }
        ContactsCommand::Update {
            id,
            name,
            phone,
            email,
            address,
        } => {
            let input = ContactInput {
                name: name.clone(),
                phone: phone.clone(),
                email: email.clone(),
                address: address.clone(),
            };
            print_json(&state.contacts.update(id, &input).await?)
        }
        ContactsCommand::Delete { id } => {
            state.contacts.delete(id).await?;
            println!("Contact {} deleted", id);
            Ok(())
        }
        ContactsCommand::Import { file, submit } => {
            let text = fs::read_to_string(file)?;
            let parsed = state.contacts.import_vcard(&text);
            if !*submit {
                return print_json(&parsed);
            }

            let results = state.contacts.submit_parsed(parsed).await;
            let failed = results.iter().filter(|(_, r)| r.is_err()).count();
            for (contact, result) in &results {
                match result {
                    Ok(added) => println!("added   {} ({})", contact.full_name, added.id),
                    Err(e) => println!("failed  {}: {}", contact.full_name, e.user_message()),
                }
            }
            println!("{} of {} contacts imported", results.len() - failed, results.len());
            Ok(())
        }
    }
}

async fn orders(state: &AppState, action: &OrdersCommand) -> CommandResult {
    match action {
        OrdersCommand::List => print_json(&state.orders.live_orders().await?),
        OrdersCommand::Show { id } => print_json(&state.orders.live_order(id).await?),
        OrdersCommand::Approve { id } => {
            state.orders.approve(id).await?;
            println!("Order {} approved", id);
            Ok(())
        }
        OrdersCommand::Reject { id, reason } => {
            state.orders.reject(id, reason).await?;
            println!("Order {} rejected", id);
            Ok(())
        }
    }
}

async fn transactions(state: &AppState, action: &TransactionsCommand) -> CommandResult {
    match action {
        TransactionsCommand::List => print_json(&state.orders.transactions().await?),
        TransactionsCommand::Add {
            contact_id,
            amount,
            description,
        } => {
            let input = ManualTransactionInput {
                contact_id: contact_id.clone(),
                amount: *amount,
                description: description.clone(),
            };
            print_json(&state.orders.create_manual_transaction(&input).await?)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_launch_options_from_flags() {
        let command = Commands::Launch {
            url: None,
            notification: Some(r#"{"data":{"navigate_to":"live-order","transaction_id":9}}"#.to_string()),
            deny_push: true,
        };
        let options = launch_options(&command).unwrap();
        assert_eq!(options.permission, PermissionStatus::Denied);
        let payload = options.initial_notification.unwrap();
        assert_eq!(payload.navigate_to(), Some("live-order"));
        assert_eq!(payload.transaction_id(), Some("9"));
    }

    #[test]
    fn test_launch_options_reject_bad_notification() {
        let command = Commands::Launch {
            url: None,
            notification: Some("not json".to_string()),
            deny_push: false,
        };
        assert!(matches!(
            launch_options(&command),
            Err(AppError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_other_commands_use_defaults() {
        let options = launch_options(&Commands::Balance).unwrap();
        assert_eq!(options.permission, PermissionStatus::Granted);
        assert!(options.initial_notification.is_none());
    }
}
