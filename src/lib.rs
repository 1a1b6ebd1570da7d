// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-ContextViewer-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Context Viewer and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Context Viewer: a terminal file viewer that shares line selections with an AI assistant.
//!
//! The viewer and the assistant-facing MCP server never talk directly. Both read and write one
//! small JSON document (see [`store::StateStore`]): the human's committed selection flows one way,
//! navigation commands the other.

pub mod capture;
pub mod config;
pub mod launcher;
pub mod logging;
pub mod mcp;
pub mod model;
pub mod navigation;
pub mod retrieval;
pub mod store;
pub mod tui;
pub mod web;
pub mod workspace;

#[cfg(test)]
mod test_utils;
