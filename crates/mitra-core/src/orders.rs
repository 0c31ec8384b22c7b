// SPDX-License-Identifier: AGPL-3.0
// Mitra Core - Live orders and transactions

use crate::api::{Backend, Endpoint};
use crate::types::{amount_from_any, id_from_any, AppError};
use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// An order waiting for the mitra to accept or refuse it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveOrder {
    #[serde(deserialize_with = "id_from_any")]
    pub id: String,
    #[serde(default)]
    pub nama_konsumen: Option<String>,
    #[serde(default)]
    pub alamat: Option<String>,
    #[serde(default, deserialize_with = "amount_from_any")]
    pub total: u64,
    #[serde(default)]
    pub status: Option<String>,
    /// Whatever else the backend sends along
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(deserialize_with = "id_from_any")]
    pub id: String,
    #[serde(default, deserialize_with = "amount_from_any")]
    pub nominal: u64,
    #[serde(default)]
    pub keterangan: Option<String>,
    #[serde(default)]
    pub jenis: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Transaction {
    /// Creation time, accepting RFC 3339 and plain `YYYY-MM-DD HH:MM:SS`
    pub fn created(&self) -> Option<NaiveDateTime> {
        let raw = self.created_at.as_deref()?.trim();
        DateTime::parse_from_rfc3339(raw)
            .map(|dt| dt.naive_local())
            .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S"))
            .ok()
    }
}

/// A transaction recorded by hand against a contact
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ManualTransactionInput {
    pub contact_id: String,
    pub amount: u64,
    pub description: String,
}

impl ManualTransactionInput {
    fn to_body(&self) -> Result<Value, AppError> {
        let contact_id = self.contact_id.trim();
        if contact_id.is_empty() {
            return Err(AppError::InvalidInput("Pilih kontak terlebih dahulu".to_string()));
        }
        if self.amount == 0 {
            return Err(AppError::InvalidInput(
                "Nominal harus lebih dari 0".to_string(),
            ));
        }
        let description = self.description.trim();
        if description.is_empty() {
            return Err(AppError::InvalidInput("Keterangan wajib diisi".to_string()));
        }

        Ok(json!({
            "id_kontak": contact_id,
            "nominal": self.amount,
            "keterangan": description,
        }))
    }
}

pub struct Orders {
    backend: Backend,
}

impl Orders {
    pub fn new(backend: Backend) -> Self {
        Self { backend }
    }

    pub async fn live_orders(&self) -> Result<Vec<LiveOrder>, AppError> {
        self.backend
            .call(Endpoint::ListLiveOrders, None)
            .await?
            .decode()
    }

    pub async fn live_order(&self, id: &str) -> Result<LiveOrder, AppError> {
        self.backend
            .call(Endpoint::LiveOrder { id: id.to_string() }, None)
            .await?
            .decode()
    }

    pub async fn approve(&self, id: &str) -> Result<(), AppError> {
        self.backend
            .call(Endpoint::ApproveLiveOrder { id: id.to_string() }, None)
            .await?
            .into_data()?;
        tracing::info!("Live order {} approved", id);
        Ok(())
    }

    pub async fn reject(&self, id: &str, reason: &str) -> Result<(), AppError> {
        let reason = reason.trim();
        let body = if reason.is_empty() {
            None
        } else {
            Some(json!({ "alasan": reason }))
        };
        self.backend
            .call(Endpoint::RejectLiveOrder { id: id.to_string() }, body)
            .await?
            .into_data()?;
        tracing::info!("Live order {} rejected", id);
        Ok(())
    }

    pub async fn transactions(&self) -> Result<Vec<Transaction>, AppError> {
        self.backend
            .call(Endpoint::ListTransactions, None)
            .await?
            .decode()
    }

    pub async fn create_manual_transaction(
        &self,
        input: &ManualTransactionInput,
    ) -> Result<Transaction, AppError> {
        let body = input.to_body()?;
        let transaction: Transaction = self
            .backend
            .call(Endpoint::CreateManualTransaction, Some(body))
            .await?
            .decode()?;
        tracing::info!("Manual transaction {} recorded", transaction.id);
        Ok(transaction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ApiResponse, MockApiClient};
    use crate::session::SessionStore;
    use crate::storage::{KeyValueStore, MemoryKeyValueStore, USER_TOKEN_KEY};
    use chrono::{Datelike, Timelike};
    use std::sync::Arc;

    fn orders(api: MockApiClient) -> Orders {
        let storage = Arc::new(MemoryKeyValueStore::new());
        storage.set(USER_TOKEN_KEY, "tok").unwrap();
        Orders::new(Backend::new(Arc::new(api), SessionStore::new(storage)))
    }

    #[tokio::test]
    async fn test_live_order_keeps_unknown_fields() {
        let mut api = MockApiClient::new();
        api.expect_send()
            .withf(|r| r.endpoint == Endpoint::LiveOrder { id: "987".to_string() })
            .returning(|_| {
                Ok(ApiResponse::ok(json!({
                    "id": 987, "nama_konsumen": "Rina", "total": "45000",
                    "jarak_km": 3.2
                })))
            });
        let order = orders(api).live_order("987").await.unwrap();
        assert_eq!(order.id, "987");
        assert_eq!(order.total, 45_000);
        assert_eq!(order.extra.get("jarak_km"), Some(&json!(3.2)));
    }

    #[tokio::test]
    async fn test_reject_sends_reason() {
        let mut api = MockApiClient::new();
        api.expect_send()
            .withf(|r| {
                r.endpoint == Endpoint::RejectLiveOrder { id: "5".to_string() }
                    && r.body == Some(json!({"alasan": "Terlalu jauh"}))
            })
            .times(1)
            .returning(|_| Ok(ApiResponse::ok(Value::Null)));
        orders(api).reject("5", " Terlalu jauh ").await.unwrap();
    }

    #[tokio::test]
    async fn test_approve_already_taken() {
        let mut api = MockApiClient::new();
        api.expect_send()
            .returning(|_| Ok(ApiResponse::failure("Order sudah diambil")));
        let err = orders(api).approve("5").await.unwrap_err();
        assert_eq!(err.user_message(), "Order sudah diambil");
    }

    #[tokio::test]
    async fn test_manual_transaction_validation() {
        let mut api = MockApiClient::new();
        api.expect_send().never();
        let orders = orders(api);

        let no_contact = ManualTransactionInput {
            amount: 1000,
            description: "Antar paket".to_string(),
            ..Default::default()
        };
        assert!(orders.create_manual_transaction(&no_contact).await.is_err());

        let zero = ManualTransactionInput {
            contact_id: "3".to_string(),
            amount: 0,
            description: "Antar paket".to_string(),
        };
        assert!(orders.create_manual_transaction(&zero).await.is_err());

        let blank = ManualTransactionInput {
            contact_id: "3".to_string(),
            amount: 1000,
            description: "  ".to_string(),
        };
        assert!(orders.create_manual_transaction(&blank).await.is_err());
    }

    #[tokio::test]
    async fn test_manual_transaction_created() {
        let mut api = MockApiClient::new();
        api.expect_send()
            .withf(|r| r.endpoint == Endpoint::CreateManualTransaction)
            .returning(|_| {
                Ok(ApiResponse::ok(json!({
                    "id": 77, "nominal": 25000, "keterangan": "Antar paket",
                    "created_at": "2024-03-05 14:30:00"
                })))
            });
        let input = ManualTransactionInput {
            contact_id: "3".to_string(),
            amount: 25_000,
            description: "Antar paket".to_string(),
        };
        let transaction = orders(api).create_manual_transaction(&input).await.unwrap();
        assert_eq!(transaction.id, "77");
        let created = transaction.created().unwrap();
        assert_eq!((created.month(), created.day(), created.hour()), (3, 5, 14));
    }

    #[test]
    fn test_created_accepts_rfc3339() {
        let transaction: Transaction = serde_json::from_value(json!({
            "id": "t1", "created_at": "2024-03-05T14:30:00+07:00"
        }))
        .unwrap();
        assert_eq!(transaction.created().unwrap().hour(), 14);
        assert_eq!(transaction.nominal, 0);
    }
}
