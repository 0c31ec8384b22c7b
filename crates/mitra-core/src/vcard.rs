// SPDX-License-Identifier: AGPL-3.0
// Mitra Core - vCard import
//
// Reads contacts out of a user-picked .vcf file. Nothing is persisted
// here; parsed contacts go to the API only when the user submits them.

use serde::Serialize;

/// A contact read from a vCard
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedContact {
    pub full_name: String,
    pub phone_number: String,
    pub email: Option<String>,
    pub address: Option<String>,
}

#[derive(Default)]
struct CardFields {
    formatted_name: Option<String>,
    structured_name: Option<String>,
    phone: Option<String>,
    email: Option<String>,
    address: Option<String>,
}

impl CardFields {
    fn finish(self, index: usize) -> Option<ParsedContact> {
        let full_name = self
            .formatted_name
            .or(self.structured_name)
            .filter(|n| !n.is_empty());
        let (Some(full_name), Some(phone_number)) = (full_name, self.phone) else {
            tracing::warn!("Skipping vCard #{} without name or phone number", index + 1);
            return None;
        };

        Some(ParsedContact {
            full_name,
            phone_number,
            email: self.email,
            address: self.address,
        })
    }
}

/// Parse every card in `text`. Cards missing a name or phone are skipped.
pub fn parse(text: &str) -> Vec<ParsedContact> {
    let mut contacts = Vec::new();
    let mut current: Option<CardFields> = None;
    let mut index = 0;

    for line in unfold(text) {
        let Some((name, value)) = split_property(&line) else {
            continue;
        };

        match name.as_str() {
            "BEGIN" if value.eq_ignore_ascii_case("VCARD") => {
                current = Some(CardFields::default());
            }
            "END" if value.eq_ignore_ascii_case("VCARD") => {
                if let Some(card) = current.take() {
                    contacts.extend(card.finish(index));
                    index += 1;
                }
            }
            _ => {
                if let Some(card) = current.as_mut() {
                    apply_property(card, &name, value);
                }
            }
        }
    }

    if current.is_some() {
        tracing::warn!("vCard file ends inside a card; last card ignored");
    }
    contacts
}

fn apply_property(card: &mut CardFields, name: &str, value: &str) {
    let value = unescape(value);
    let value = value.trim();
    if value.is_empty() {
        return;
    }

    match name {
        "FN" => {
            card.formatted_name.get_or_insert_with(|| value.to_string());
        }
        "N" => {
            // family;given;additional;prefix;suffix
            let parts: Vec<&str> = value.split(';').map(str::trim).collect();
            let ordered: Vec<&str> = [3, 1, 2, 0, 4]
                .iter()
                .filter_map(|i| parts.get(*i).copied())
                .filter(|p| !p.is_empty())
                .collect();
            if !ordered.is_empty() {
                card.structured_name
                    .get_or_insert_with(|| ordered.join(" "));
            }
        }
        "TEL" => {
            let phone: String = value
                .trim_start_matches("tel:")
                .chars()
                .filter(|c| c.is_ascii_digit() || *c == '+')
                .collect();
            if !phone.is_empty() {
                card.phone.get_or_insert(phone);
            }
        }
        "EMAIL" => {
            card.email.get_or_insert_with(|| value.to_string());
        }
        "ADR" => {
            let joined = value
                .split(';')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .collect::<Vec<_>>()
                .join(", ");
            if !joined.is_empty() {
                card.address.get_or_insert(joined);
            }
        }
        _ => {}
    }
}

/// Join folded continuation lines (leading space or tab)
fn unfold(text: &str) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    for raw in text.lines() {
        let raw = raw.trim_end_matches('\r');
        match (raw.strip_prefix([' ', '\t']), lines.last_mut()) {
            (Some(rest), Some(last)) => last.push_str(rest),
            _ => lines.push(raw.to_string()),
        }
    }
    lines
}

/// Split `group.NAME;PARAMS:value` into upper-cased NAME and value
fn split_property(line: &str) -> Option<(String, &str)> {
    let (head, value) = line.split_once(':')?;
    let name = head.split(';').next()?;
    let name = name.rsplit('.').next()?;
    if name.is_empty() {
        return None;
    }
    Some((name.to_ascii_uppercase(), value))
}

fn unescape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') | Some('N') => out.push(' '),
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}
