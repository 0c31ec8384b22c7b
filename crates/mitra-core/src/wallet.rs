// SPDX-License-Identifier: AGPL-3.0
// Mitra Core - Saldo (balance) operations

use crate::api::{Backend, Endpoint};
use crate::types::{amount_from_any, id_from_any, normalize_phone, AppError};
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Balance {
    #[serde(deserialize_with = "amount_from_any")]
    pub saldo: u64,
}

/// A pending top-up awaiting payment confirmation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopUpTicket {
    #[serde(deserialize_with = "id_from_any")]
    pub id: String,
    #[serde(default, deserialize_with = "amount_from_any")]
    pub nominal: u64,
    #[serde(default)]
    pub status: Option<String>,
    /// Transfer destination shown to the user
    #[serde(default)]
    pub rekening_tujuan: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WithdrawRequest {
    pub amount: u64,
    pub bank: String,
    pub account_number: String,
    pub account_name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransferRequest {
    pub recipient_phone: String,
    pub amount: u64,
    pub note: Option<String>,
}

pub struct Wallet {
    backend: Backend,
    min_amount: u64,
}

impl Wallet {
    pub fn new(backend: Backend, min_amount: u64) -> Self {
        Self {
            backend,
            min_amount,
        }
    }

    fn check_amount(&self, amount: u64) -> Result<(), AppError> {
        if amount == 0 || amount < self.min_amount {
            return Err(AppError::InvalidInput(format!(
                "Nominal minimal Rp {}",
                format_rupiah(self.min_amount)
            )));
        }
        Ok(())
    }

    pub async fn balance(&self) -> Result<Balance, AppError> {
        self.backend.call(Endpoint::Balance, None).await?.decode()
    }

    pub async fn top_up(&self, amount: u64, method: &str) -> Result<TopUpTicket, AppError> {
        self.check_amount(amount)?;
        let method = method.trim();
        if method.is_empty() {
            return Err(AppError::InvalidInput(
                "Pilih metode pembayaran".to_string(),
            ));
        }

        let ticket: TopUpTicket = self
            .backend
            .call(
                Endpoint::TopUp,
                Some(json!({ "nominal": amount, "metode": method })),
            )
            .await?
            .decode()?;
        tracing::info!("Top-up {} requested for Rp {}", ticket.id, amount);
        Ok(ticket)
    }

    pub async fn confirm_top_up(&self, id: &str) -> Result<(), AppError> {
        self.backend
            .call(Endpoint::ConfirmTopUp { id: id.to_string() }, None)
            .await?
            .into_data()?;
        tracing::info!("Top-up {} confirmed", id);
        Ok(())
    }

    pub async fn withdraw(&self, request: &WithdrawRequest) -> Result<(), AppError> {
        self.check_amount(request.amount)?;
        let account_number: String = request
            .account_number
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        if request.bank.trim().is_empty()
            || request.account_name.trim().is_empty()
            || account_number.is_empty()
            || !account_number.chars().all(|c| c.is_ascii_digit())
        {
            return Err(AppError::InvalidInput(
                "Data rekening tidak lengkap".to_string(),
            ));
        }

        self.backend
            .call(
                Endpoint::Withdraw,
                Some(json!({
                    "nominal": request.amount,
                    "bank": request.bank.trim(),
                    "no_rekening": account_number,
                    "nama_rekening": request.account_name.trim(),
                })),
            )
            .await?
            .into_data()?;
        tracing::info!("Withdraw of Rp {} requested", request.amount);
        Ok(())
    }

    pub async fn transfer(&self, request: &TransferRequest) -> Result<(), AppError> {
        self.check_amount(request.amount)?;
        let recipient = normalize_phone(&request.recipient_phone)?;
        let own_phone = self
            .backend
            .sessions()
            .profile()?
            .map(|p| normalize_phone(&p.no_hp).unwrap_or(p.no_hp));
        if own_phone.as_deref() == Some(recipient.as_str()) {
            return Err(AppError::InvalidInput(
                "Tidak dapat transfer ke nomor sendiri".to_string(),
            ));
        }

        self.backend
            .call(
                Endpoint::Transfer,
                Some(json!({
                    "no_hp_tujuan": recipient,
                    "nominal": request.amount,
                    "catatan": request.note.as_deref().map(str::trim).unwrap_or(""),
                })),
            )
            .await?
            .into_data()?;
        tracing::info!("Transfer of Rp {} to {} sent", request.amount, recipient);
        Ok(())
    }
}

/// Thousands-separated rupiah amount, "10.000"
pub fn format_rupiah(amount: u64) -> String {
    let digits = amount.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push('.');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ApiResponse, MockApiClient};
    use crate::session::SessionStore;
    use crate::storage::{KeyValueStore, MemoryKeyValueStore, USER_DATA_KEY, USER_TOKEN_KEY};
    use std::sync::Arc;

    fn wallet(api: MockApiClient) -> Wallet {
        let storage = Arc::new(MemoryKeyValueStore::new());
        storage.set(USER_TOKEN_KEY, "tok").unwrap();
        storage
            .set(USER_DATA_KEY, r#"{"no_hp":"6281234567890"}"#)
            .unwrap();
        Wallet::new(
            Backend::new(Arc::new(api), SessionStore::new(storage)),
            10_000,
        )
    }

    #[test]
    fn test_format_rupiah() {
        assert_eq!(format_rupiah(0), "0");
        assert_eq!(format_rupiah(999), "999");
        assert_eq!(format_rupiah(10_000), "10.000");
        assert_eq!(format_rupiah(1_250_000), "1.250.000");
    }

    #[tokio::test]
    async fn test_balance_accepts_string_amount() {
        let mut api = MockApiClient::new();
        api.expect_send()
            .returning(|_| Ok(ApiResponse::ok(json!({"saldo": "150000.00"}))));
        assert_eq!(wallet(api).balance().await.unwrap().saldo, 150_000);
    }

    #[tokio::test]
    async fn test_top_up_below_minimum_is_rejected() {
        let mut api = MockApiClient::new();
        api.expect_send().never();
        let err = wallet(api).top_up(5_000, "bca").await.unwrap_err();
        assert_eq!(err.user_message(), "Nominal minimal Rp 10.000");
    }

    #[tokio::test]
    async fn test_top_up_returns_ticket() {
        let mut api = MockApiClient::new();
        api.expect_send()
            .withf(|r| {
                r.endpoint == Endpoint::TopUp
                    && r.body == Some(json!({"nominal": 50000, "metode": "bca"}))
            })
            .returning(|_| {
                Ok(ApiResponse::ok(json!({
                    "id": 31, "nominal": 50000, "status": "pending",
                    "rekening_tujuan": "BCA 123"
                })))
            });
        let ticket = wallet(api).top_up(50_000, " bca ").await.unwrap();
        assert_eq!(ticket.id, "31");
        assert_eq!(ticket.status.as_deref(), Some("pending"));
    }

    #[tokio::test]
    async fn test_transfer_to_self_is_rejected() {
        let mut api = MockApiClient::new();
        api.expect_send().never();
        let request = TransferRequest {
            recipient_phone: "0812-3456-7890".to_string(),
            amount: 20_000,
            note: None,
        };
        assert!(matches!(
            wallet(api).transfer(&request).await,
            Err(AppError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_transfer_sends_normalized_recipient() {
        let mut api = MockApiClient::new();
        api.expect_send()
            .withf(|r| {
                r.endpoint == Endpoint::Transfer
                    && r.body.as_ref().map(|b| b["no_hp_tujuan"] == "6285711112222")
                        == Some(true)
            })
            .times(1)
            .returning(|_| Ok(ApiResponse::ok(json!({}))));
        let request = TransferRequest {
            recipient_phone: "085711112222".to_string(),
            amount: 20_000,
            note: Some(" makan ".to_string()),
        };
        wallet(api).transfer(&request).await.unwrap();
    }

    #[tokio::test]
    async fn test_withdraw_requires_account() {
        let mut api = MockApiClient::new();
        api.expect_send().never();
        let request = WithdrawRequest {
            amount: 100_000,
            bank: "BRI".to_string(),
            account_number: "12a4".to_string(),
            account_name: "Budi".to_string(),
        };
        assert!(wallet(api).withdraw(&request).await.is_err());
    }

    #[tokio::test]
    async fn test_server_rejection_surfaces_message() {
        let mut api = MockApiClient::new();
        api.expect_send()
            .returning(|_| Ok(ApiResponse::failure("Saldo tidak mencukupi")));
        let request = WithdrawRequest {
            amount: 100_000,
            bank: "BRI".to_string(),
            account_number: "0012 3456".to_string(),
            account_name: "Budi".to_string(),
        };
        let err = wallet(api).withdraw(&request).await.unwrap_err();
        assert_eq!(err.user_message(), "Saldo tidak mencukupi");
    }
}
