// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-ContextViewer-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Context Viewer and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Persistence for the shared state document.
//!
//! The store module owns the single JSON file that the viewer and the tool server use to
//! coordinate. Every write is an atomic whole-file replace and every read fails soft.

pub mod state_file;

pub use state_file::{default_state_path, StateStore, StoreError, WriteDurability};
