// SPDX-License-Identifier: AGPL-3.0
// Mitra Core - Customer contacts
//
// Contacts live on the backend; this is the CRUD surface plus vCard import.
// Imported contacts stay in memory until submitted.

use crate::api::{Backend, Endpoint};
use crate::types::{id_from_any, normalize_phone, AppError};
use crate::vcard::{self, ParsedContact};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// A customer record usable in manual transactions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    #[serde(deserialize_with = "id_from_any")]
    pub id: String,
    pub nama: String,
    pub no_hp: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub alamat: Option<String>,
}

/// Fields for creating or editing a contact
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContactInput {
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub address: Option<String>,
}

impl ContactInput {
    fn to_body(&self) -> Result<Value, AppError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(AppError::InvalidInput("Nama kontak wajib diisi".to_string()));
        }
        let no_hp = normalize_phone(&self.phone)?;

        let mut body = Map::new();
        body.insert("nama".to_string(), json!(name));
        body.insert("no_hp".to_string(), json!(no_hp));
        if let Some(email) = self.email.as_deref().map(str::trim).filter(|e| !e.is_empty()) {
            if !email.contains('@') {
                return Err(AppError::InvalidInput("Format email tidak valid".to_string()));
            }
            body.insert("email".to_string(), json!(email));
        }
        if let Some(address) = self.address.as_deref().map(str::trim).filter(|a| !a.is_empty()) {
            body.insert("alamat".to_string(), json!(address));
        }
        Ok(Value::Object(body))
    }
}

impl From<ParsedContact> for ContactInput {
    fn from(parsed: ParsedContact) -> Self {
        Self {
            name: parsed.full_name,
            phone: parsed.phone_number,
            email: parsed.email,
            address: parsed.address,
        }
    }
}

pub struct ContactBook {
    backend: Backend,
}

impl ContactBook {
    pub fn new(backend: Backend) -> Self {
        Self { backend }
    }

    pub async fn list(&self) -> Result<Vec<Contact>, AppError> {
        self.backend
            .call(Endpoint::ListContacts, None)
            .await?
            .decode()
    }

    pub async fn get(&self, id: &str) -> Result<Option<Contact>, AppError> {
        Ok(self.list().await?.into_iter().find(|c| c.id == id))
    }

    pub async fn add(&self, input: &ContactInput) -> Result<Contact, AppError> {
        let body = input.to_body()?;
        let contact: Contact = self
            .backend
            .call(Endpoint::CreateContact, Some(body))
            .await?
            .decode()?;
        tracing::info!("Contact {} added", contact.id);
        Ok(contact)
    }

    pub async fn update(&self, id: &str, input: &ContactInput) -> Result<Contact, AppError> {
        let body = input.to_body()?;
        self.backend
            .call(Endpoint::UpdateContact { id: id.to_string() }, Some(body))
            .await?
            .decode()
    }

    pub async fn delete(&self, id: &str) -> Result<(), AppError> {
        self.backend
            .call(Endpoint::DeleteContact { id: id.to_string() }, None)
            .await?
            .into_data()?;
        tracing::info!("Contact {} deleted", id);
        Ok(())
    }

    /// Parse a vCard file; nothing is sent yet
    pub fn import_vcard(&self, text: &str) -> Vec<ParsedContact> {
        let contacts = vcard::parse(text);
        tracing::info!("Parsed {} contacts from vCard", contacts.len());
        contacts
    }

    /// Add parsed contacts one by one, reporting each outcome
    pub async fn submit_parsed(
        &self,
        contacts: Vec<ParsedContact>,
    ) -> Vec<(ParsedContact, Result<Contact, AppError>)> {
        let mut results = Vec::with_capacity(contacts.len());
        for parsed in contacts {
            let input = ContactInput::from(parsed.clone());
            let result = self.add(&input).await;
            if let Err(e) = &result {
                tracing::warn!("Failed to import {}: {}", parsed.full_name, e);
            }
            results.push((parsed, result));
        }
        results
    }
}
