// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-ContextViewer-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Context Viewer and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{NavigationCommand, Selection};

/// The single document shared between the viewer and the assistant-facing tool layer.
///
/// Every field is optional and an absent field means "not present": no known server, no
/// selection, no pending navigation. The empty state serializes as `{}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SharedState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_pid: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection: Option<Selection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub navigation: Option<NavigationCommand>,
}

/// Fields of a state document that had to be discarded while decoding it leniently.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DroppedFields {
    pub fields: Vec<&'static str>,
}

impl DroppedFields {
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl SharedState {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Decodes a state document field by field.
    ///
    /// Returns `None` when the document is not a JSON object. Individual fields that fail to
    /// decode are left empty and reported in [`DroppedFields`] instead of failing the whole
    /// document, so a malformed selection never hides a valid navigation command (or vice versa).
    pub fn from_value_lenient(value: Value) -> Option<(Self, DroppedFields)> {
        let Value::Object(mut map) = value else {
            return None;
        };

        let mut dropped = DroppedFields::default();
        let mut take = |key: &'static str| -> Option<Value> {
            match map.remove(key) {
                None | Some(Value::Null) => None,
                Some(value) => Some(value),
            }
        };

        let server_url = take("server_url");
        let server_pid = take("server_pid");
        let selection = take("selection");
        let navigation = take("navigation");

        let state = Self {
            server_url: decode_field(server_url, "server_url", &mut dropped),
            server_pid: decode_field(server_pid, "server_pid", &mut dropped),
            selection: decode_field(selection, "selection", &mut dropped),
            navigation: decode_field(navigation, "navigation", &mut dropped),
        };

        Some((state, dropped))
    }
}

fn decode_field<T: serde::de::DeserializeOwned>(
    raw: Option<Value>,
    name: &'static str,
    dropped: &mut DroppedFields,
) -> Option<T> {
    let raw = raw?;
    match serde_json::from_value(raw) {
        Ok(value) => Some(value),
        Err(_) => {
            dropped.fields.push(name);
            None
        }
    }
}
