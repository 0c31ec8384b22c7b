// SPDX-License-Identifier: AGPL-3.0
// Mitra Core - Shared logic for all frontends
//
// This crate provides:
// - AppSettings and AppError types
// - SettingsStore and the persisted key-value store
// - SessionGate for the launch-time session check
// - DeepLinkRouter and the shared route table
// - PushBridge and the in-app notification banner
// - API-backed services: auth, contacts, wallet, orders
//
// Screens and platform integrations live in the frontend crates; they plug
// in through the Navigator, PushProvider and ApiClient traits.

pub mod api;
pub mod auth;
pub mod banner;
pub mod contacts;
pub mod deep_link;
pub mod events;
pub mod gate;
pub mod orders;
pub mod push;
pub mod routes;
pub mod session;
pub mod settings;
pub mod storage;
pub mod types;
pub mod vcard;
pub mod wallet;

// Re-export commonly used items
pub use api::{ApiClient, ApiRequest, ApiResponse, Backend, Endpoint, HttpApiClient};
pub use auth::AuthService;
pub use banner::{BannerEvent, BannerState, InAppBanner};
pub use contacts::{Contact, ContactBook, ContactInput};
pub use deep_link::{DeepLinkRouter, Navigator};
pub use events::{AppEvent, EventRegistry, Subscription};
pub use gate::{GateDecision, SessionGate};
pub use orders::{LiveOrder, ManualTransactionInput, Orders, Transaction};
pub use push::{PermissionStatus, PushBridge, PushDelivery, PushPayload, PushProvider, PushStatus};
pub use routes::{NavigationTarget, Route};
pub use session::{Session, SessionStore, UserProfile};
pub use settings::SettingsStore;
pub use storage::{FileKeyValueStore, KeyValueStore, MemoryKeyValueStore};
pub use types::{normalize_phone, AppError, AppSettings};
pub use vcard::ParsedContact;
pub use wallet::{Balance, TopUpTicket, TransferRequest, Wallet, WithdrawRequest};
